//! Password hashing and credential lookup.
//!
//! Argon2id with a random salt; verification is constant-time by
//! construction. The raw password never leaves this module.

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::AuthError;
use crate::storage::models::User;
use crate::storage::Database;

/// Hash a raw password into an Argon2 PHC string
pub fn hash(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Verify a raw password against a stored hash
pub fn verify(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(password_hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Look up a user by email and verify the password.
///
/// Unknown email and wrong password are indistinguishable to the caller:
/// both fail with `InvalidCredentials`, and the unknown-email path still
/// performs a full Argon2 verification against a fixed dummy hash so the
/// response time does not reveal whether the account exists.
pub fn find_user_by_credentials(
    db: &Database,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    match db.get_user_by_email(email)? {
        Some(user) => {
            verify(password, &user.password_hash)?;
            Ok(user)
        }
        None => {
            let _ = verify(password, dummy_hash());
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash("taskboard-dummy-password").expect("argon2 hashing cannot fail"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::setup_db;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash("secret123").unwrap();
        assert_ne!(hashed, "secret123");

        assert!(verify("secret123", &hashed).is_ok());
        assert!(matches!(
            verify("wrong", &hashed).unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        // Random salt per hash
        assert_ne!(hash("secret123").unwrap(), hash("secret123").unwrap());
    }

    #[test]
    fn test_find_by_credentials() {
        let (db, _temp) = setup_db();

        let mut user = crate::testutil::make_user("u1", "a@x.com");
        user.password_hash = hash("secret123").unwrap();
        db.put_user(&user).unwrap();

        let found = find_user_by_credentials(&db, "a@x.com", "secret123").unwrap();
        assert_eq!(found.id, "u1");
    }

    #[test]
    fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let (db, _temp) = setup_db();

        let mut user = crate::testutil::make_user("u1", "a@x.com");
        user.password_hash = hash("secret123").unwrap();
        db.put_user(&user).unwrap();

        let wrong_password = find_user_by_credentials(&db, "a@x.com", "nope").unwrap_err();
        let unknown_email = find_user_by_credentials(&db, "b@x.com", "nope").unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    }
}
