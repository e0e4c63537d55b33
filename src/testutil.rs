//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use chrono::Utc;
use tempfile::TempDir;

use crate::config::{Config, NodeConfig, TokenConfig};
use crate::storage::models::{Session, User};
use crate::storage::Database;

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard — the caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// A minimal `Config` suitable for unit tests.
pub fn test_config() -> Config {
    Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:3000".to_string(),
            data_dir: "/tmp/test".to_string(),
        },
        tokens: TokenConfig::default(),
    }
}

/// Create a `User` with the given id and email.
///
/// The password hash is a placeholder; tests that exercise credential
/// verification overwrite it with a real Argon2 hash.
pub fn make_user(id: &str, email: &str) -> User {
    User {
        created_at: Utc::now(),
        email: email.to_string(),
        id: id.to_string(),
        password_hash: format!("hash_{id}"),
        session_secret: crate::auth::generator::generate_secret(),
        sessions: Vec::new(),
    }
}

/// Create an unexpired `Session` with the given token.
pub fn make_session(token: &str) -> Session {
    let now = Utc::now();
    Session {
        created_at: now,
        expires_at: now + chrono::Duration::days(10),
        token: token.to_string(),
    }
}
