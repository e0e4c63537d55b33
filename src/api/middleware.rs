//! Request-gating middleware.
//!
//! Two independent protocols guard the API: the access gate verifies signed
//! access tokens statelessly, and the session gate checks refresh tokens
//! against the stored session list. Both attach an authenticated principal
//! to the request or reject with a generic 401 without calling downstream.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::auth::{session, token, AuthError};
use crate::storage::models::User;
use crate::AppState;

/// Access token header, set on login/signup and presented on every request
pub const X_ACCESS_TOKEN: &str = "x-access-token";
/// Refresh token header, presented only to the session gate
pub const X_REFRESH_TOKEN: &str = "x-refresh-token";
/// User id header, presented alongside the refresh token
pub const USER_ID_HEADER: &str = "_id";

/// Authenticated identity attached by the access gate
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
}

/// Principal attached by the session gate: the full user plus the refresh
/// token that was presented
#[derive(Debug, Clone)]
pub struct SessionPrincipal {
    pub refresh_token: String,
    pub user: User,
}

/// Access gate: cheap, stateless verification of the `x-access-token` header.
///
/// The store is touched only to resolve the claimed user's signing secret;
/// the embedded id is trusted solely after signature verification succeeds.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(X_ACCESS_TOKEN)
        .and_then(|v| v.to_str().ok())
    {
        Some(t) => t.to_string(),
        None => return reject(AuthError::Unauthenticated),
    };

    match verify_access(&state, &token) {
        Ok(user_id) => {
            request.extensions_mut().insert(Principal { user_id });
            next.run(request).await
        }
        Err(e) => reject(e),
    }
}

fn verify_access(state: &AppState, token: &str) -> Result<String, AuthError> {
    // Unverified peek, used only to select which secret to verify against
    let claimed = token::claimed_subject(token)?;

    // Fail closed if the claimed user cannot be resolved
    let user = state
        .db
        .get_user(&claimed)?
        .ok_or(AuthError::Unauthenticated)?;

    token::verify_access_token(token, &user.session_secret)
}

/// Session gate: stateful verification of `x-refresh-token` + `_id`.
///
/// Strictly more expensive than the access gate (store round-trip); used
/// only by operations that mint fresh access tokens.
pub async fn verify_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let refresh_token = request
        .headers()
        .get(X_REFRESH_TOKEN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (refresh_token, user_id) = match (refresh_token, user_id) {
        (Some(t), Some(id)) => (t, id),
        _ => return reject(AuthError::Unauthenticated),
    };

    match session::validate(&state.db, &user_id, &refresh_token) {
        Ok((user, _session)) => {
            request.extensions_mut().insert(Principal {
                user_id: user.id.clone(),
            });
            request.extensions_mut().insert(SessionPrincipal {
                refresh_token,
                user,
            });
            next.run(request).await
        }
        Err(e) => reject(e),
    }
}

/// Terminal rejection: log the distinct reason, answer generically.
/// Store failures are logged (as errors) by the `ApiError` conversion.
fn reject(e: AuthError) -> Response {
    if !matches!(e, AuthError::Store(_)) {
        tracing::debug!(reason = %e, "Rejected request");
    }
    ApiError::from(e).into_response()
}
