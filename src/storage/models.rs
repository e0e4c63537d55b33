use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A refresh-token session, owned exclusively by its user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Absolute expiry; the session is invalid once `now >= expires_at`
    pub expires_at: DateTime<Utc>,
    /// Opaque secret token (32-byte hex), unique within the user's sessions
    pub token: String,
}

/// A user account with its active sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Unique email, matched exactly (case-sensitive)
    pub email: String,
    /// Immutable UUID identifier, assigned at signup
    pub id: String,
    /// Argon2 PHC hash of the password; the raw password is never stored
    pub password_hash: String,
    /// Per-user signing secret (32-byte hex) for this user's access tokens
    pub session_secret: String,
    /// Active sessions in insertion order; expired entries are rejected at
    /// read time and pruned by the background cleaner
    pub sessions: Vec<Session>,
}

/// A task list owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub created_at: DateTime<Utc>,
    pub id: String,
    pub title: String,
    /// Owning user; all lookups are scoped to this id
    pub user_id: String,
}

/// A task within a list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub id: String,
    pub list_id: String,
    pub title: String,
}
