use axum::extract::State;
use axum::response::AppendHeaders;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::middleware::{SessionPrincipal, X_ACCESS_TOKEN, X_REFRESH_TOKEN};
use crate::api::response::{ApiError, JSend};
use crate::auth::{generator, password, session, token};
use crate::storage::models::User;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public user document. Never carries the password hash, the signing
/// secret, or the session list.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub created_at: String,
    pub email: String,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /users — sign up, creating a session and issuing both tokens
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_signup(&req)?;

    let user = User {
        created_at: Utc::now(),
        email: req.email.clone(),
        id: uuid::Uuid::new_v4().to_string(),
        password_hash: password::hash(&req.password)?,
        session_secret: generator::generate_secret(),
        sessions: Vec::new(),
    };

    // Uniqueness is enforced by the store inside one write transaction, so
    // concurrent signups for the same email cannot both win
    let created = state
        .db
        .create_user(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if !created {
        return Err(ApiError::bad_request("email already in use"));
    }

    let refresh = session::create(&state.db, &user.id, state.config.session_ttl())?;
    let access = token::issue_access_token(&user.id, &user.session_secret, state.config.access_ttl())?;

    tracing::info!(user_id = %user.id, "Created user");

    Ok((
        AppendHeaders([(X_ACCESS_TOKEN, access), (X_REFRESH_TOKEN, refresh.token)]),
        JSend::success(user_to_response(&user)),
    ))
}

/// POST /users/login — verify credentials, create a session, issue both tokens
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = password::find_user_by_credentials(&state.db, &req.email, &req.password)?;

    let refresh = session::create(&state.db, &user.id, state.config.session_ttl())?;
    let access = token::issue_access_token(&user.id, &user.session_secret, state.config.access_ttl())?;

    tracing::debug!(user_id = %user.id, "User logged in");

    Ok((
        AppendHeaders([(X_ACCESS_TOKEN, access), (X_REFRESH_TOKEN, refresh.token)]),
        JSend::success(user_to_response(&user)),
    ))
}

/// GET /users/me/access-token — session-gated; mints a fresh access token
/// without touching the session (no sliding expiry)
pub async fn refresh_access_token(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<SessionPrincipal>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let access = token::issue_access_token(
        &principal.user.id,
        &principal.user.session_secret,
        state.config.access_ttl(),
    )?;

    Ok((
        AppendHeaders([(X_ACCESS_TOKEN, access.clone())]),
        JSend::success(AccessTokenResponse {
            access_token: access,
        }),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::bad_request("a valid email is required"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn user_to_response(user: &User) -> UserResponse {
    UserResponse {
        created_at: user.created_at.to_rfc3339(),
        email: user.email.clone(),
        id: user.id.clone(),
    }
}
