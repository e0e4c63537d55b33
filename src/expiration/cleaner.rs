use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::auth::session;
use crate::AppState;

/// Start the background expiration cleaner task.
///
/// Expired sessions are rejected at validation time regardless; this task
/// only reclaims the storage they occupy.
pub fn start_expiration_cleaner(state: Arc<AppState>) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.tokens.cleanup_interval_seconds);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;
            run_cleanup(&state).await;
        }
    })
}

async fn run_cleanup(state: &AppState) {
    debug!("Running session expiration cleanup");

    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || session::prune_expired(&db)).await;

    match result {
        Ok(Ok(count)) if count > 0 => debug!(sessions_pruned = count, "Expired sessions pruned"),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(error = %e, "Failed to prune expired sessions"),
        Err(e) => error!(error = %e, "Expiration cleanup task panicked"),
    }
}
