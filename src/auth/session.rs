//! Refresh-token session lifecycle: the stateful half of auth.
//!
//! Sessions carry one fixed absolute expiry from creation. Validation never
//! extends or rotates them; minting a new access token from a valid session
//! leaves the session untouched.

use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;

use super::generator::generate_token;
use super::AuthError;
use crate::storage::models::{Session, User};
use crate::storage::Database;

/// Create a session for `user_id` and return it (including the raw token).
///
/// The append happens inside a single store write transaction, so two
/// concurrent logins for the same user both end up in the session list.
pub fn create(db: &Database, user_id: &str, ttl: Duration) -> Result<Session, AuthError> {
    let now = Utc::now();
    let session = Session {
        created_at: now,
        expires_at: now + ttl,
        token: generate_token(),
    };

    if !db.append_session(user_id, &session)? {
        return Err(AuthError::UserNotFound);
    }

    tracing::debug!(user_id = %user_id, expires_at = %session.expires_at, "Created session");
    Ok(session)
}

/// Validate a presented refresh token against `user_id`'s stored sessions.
///
/// Fails with `UserNotFound`, `SessionNotFound`, or `SessionExpired` — kept
/// distinct for diagnostics even though the gateway collapses them into one
/// generic client-facing failure.
pub fn validate(
    db: &Database,
    user_id: &str,
    presented: &str,
) -> Result<(User, Session), AuthError> {
    let user = db.get_user(user_id)?.ok_or(AuthError::UserNotFound)?;

    let session = user
        .sessions
        .iter()
        .find(|s| tokens_match(&s.token, presented))
        .cloned()
        .ok_or(AuthError::SessionNotFound)?;

    if has_expired(session.expires_at) {
        tracing::debug!(user_id = %user_id, "Rejected expired session");
        return Err(AuthError::SessionExpired);
    }

    Ok((user, session))
}

/// The single expiry predicate: expired once `now >= expires_at`
pub fn has_expired(expires_at: DateTime<Utc>) -> bool {
    Utc::now() >= expires_at
}

/// Remove a session from `user_id`'s list. Returns true if one was removed.
pub fn revoke(db: &Database, user_id: &str, token: &str) -> Result<bool, AuthError> {
    let removed = db.remove_session(user_id, token)?;
    if removed {
        tracing::debug!(user_id = %user_id, "Revoked session");
    }
    Ok(removed)
}

/// Prune expired sessions from every user (called by the background cleaner)
pub fn prune_expired(db: &Database) -> Result<u64, AuthError> {
    Ok(db.prune_expired_sessions(Utc::now())?)
}

/// Constant-time token comparison. Length is not secret; content is.
fn tokens_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_user, setup_db};

    #[test]
    fn test_create_and_validate() {
        let (db, _temp) = setup_db();
        db.put_user(&make_user("u1", "a@x.com")).unwrap();

        let session = create(&db, "u1", Duration::days(10)).unwrap();
        assert_eq!(session.token.len(), 64);

        let (user, matched) = validate(&db, "u1", &session.token).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(matched.token, session.token);
    }

    #[test]
    fn test_create_for_missing_user() {
        let (db, _temp) = setup_db();

        let err = create(&db, "nobody", Duration::days(10)).unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[test]
    fn test_validate_distinct_failures() {
        let (db, _temp) = setup_db();
        db.put_user(&make_user("u1", "a@x.com")).unwrap();
        let session = create(&db, "u1", Duration::days(10)).unwrap();

        let err = validate(&db, "nobody", &session.token).unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));

        let err = validate(&db, "u1", "not-the-token").unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));

        let err = validate(&db, "u1", &create(&db, "u1", Duration::seconds(-1)).unwrap().token)
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));
    }

    #[test]
    fn test_expiring_one_session_leaves_others_valid() {
        let (db, _temp) = setup_db();
        db.put_user(&make_user("u1", "a@x.com")).unwrap();

        let a = create(&db, "u1", Duration::seconds(-1)).unwrap();
        let b = create(&db, "u1", Duration::days(10)).unwrap();

        assert!(matches!(
            validate(&db, "u1", &a.token).unwrap_err(),
            AuthError::SessionExpired
        ));
        assert!(validate(&db, "u1", &b.token).is_ok());
    }

    #[test]
    fn test_revoke() {
        let (db, _temp) = setup_db();
        db.put_user(&make_user("u1", "a@x.com")).unwrap();
        let session = create(&db, "u1", Duration::days(10)).unwrap();

        assert!(revoke(&db, "u1", &session.token).unwrap());
        assert!(matches!(
            validate(&db, "u1", &session.token).unwrap_err(),
            AuthError::SessionNotFound
        ));
    }

    #[test]
    fn test_has_expired() {
        assert!(has_expired(Utc::now() - Duration::seconds(1)));
        assert!(!has_expired(Utc::now() + Duration::hours(1)));
    }

    #[test]
    fn test_validation_does_not_extend_expiry() {
        let (db, _temp) = setup_db();
        db.put_user(&make_user("u1", "a@x.com")).unwrap();
        let session = create(&db, "u1", Duration::days(10)).unwrap();

        let (_, first) = validate(&db, "u1", &session.token).unwrap();
        let (_, second) = validate(&db, "u1", &session.token).unwrap();
        assert_eq!(first.expires_at, second.expires_at);
        assert_eq!(first.expires_at, session.expires_at);
    }
}
