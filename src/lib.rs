//! taskboard - a multi-user task/list manager with dual-token authentication
//!
//! This crate provides a small HTTP API with:
//! - Signup/login issuing short-lived signed access tokens and long-lived
//!   opaque refresh-token sessions (per-user signing secrets)
//! - Two request gates: a stateless access gate and a store-backed session
//!   gate for minting fresh access tokens
//! - Multi-device session lists with absolute expiry and background pruning
//! - List/task CRUD scoped to the authenticated owner
//! - redb embedded database (ACID, MVCC, crash-safe)

pub mod api;
pub mod auth;
pub mod config;
pub mod expiration;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use config::Config;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
}
