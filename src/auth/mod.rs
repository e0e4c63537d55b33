//! Authentication core: access-token codec, refresh-token session lifecycle,
//! and credential verification.
//!
//! Access tokens are short-lived signed credentials verified statelessly
//! against the owning user's `session_secret`. Refresh-token sessions are
//! long-lived opaque tokens stored in the user document and checked against
//! the store on every use.

pub mod generator;
pub mod password;
pub mod session;
pub mod token;

use thiserror::Error;

use crate::storage::DatabaseError;

/// Every way authentication can fail.
///
/// All variants are terminal at the gateway boundary. `Store` is an infra
/// failure and is logged apart from legitimate rejections, even though both
/// surface to the client as a generic 401/5xx.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access token expired")]
    Expired,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("access token signature verification failed")]
    InvalidSignature,
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("store unavailable: {0}")]
    Store(#[from] DatabaseError),
    #[error("token encoding failed")]
    TokenEncoding,
    #[error("missing or malformed credentials")]
    Unauthenticated,
    #[error("user not found")]
    UserNotFound,
}
