mod lists;
mod tasks;
mod users;

use axum::Json;

use crate::api::response::{ApiError, JSend};
use crate::storage::models::List;
use crate::storage::{Database, ResourceLookup};

pub use lists::{create_list, delete_list, get_lists, update_list};
pub use tasks::{create_task, delete_task, get_tasks, update_task};
pub use users::{login, refresh_access_token, signup};

/// Liveness probe
pub async fn health() -> Json<JSend<serde_json::Value>> {
    JSend::success(serde_json::json!({ "healthy": true }))
}

/// Resolve a list owned by `user_id`, or fail with 404.
///
/// A cross-user probe (`NotOwned`) and a dangling id (`NotFound`) are the
/// same 404 to the client, never an empty success.
fn require_list(db: &Database, list_id: &str, user_id: &str) -> Result<List, ApiError> {
    match db
        .find_list_for_user(list_id, user_id)
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        ResourceLookup::Found(list) => Ok(list),
        ResourceLookup::NotOwned => {
            tracing::debug!(list_id = %list_id, user_id = %user_id, "List not owned by requester");
            Err(ApiError::not_found("List not found"))
        }
        ResourceLookup::NotFound => Err(ApiError::not_found("List not found")),
    }
}
