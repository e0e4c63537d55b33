//! Access-token codec.
//!
//! Tokens are HS256 JWTs signed with the owning user's `session_secret`.
//! Verification is a pure function of (token, secret, now); nothing is ever
//! persisted.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Claims embedded in an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry (Unix timestamp); token is invalid once `now >= exp`
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Subject: the user id the token was issued for
    pub sub: String,
}

/// Issue a signed access token for `user_id`, valid for `ttl`
pub fn issue_access_token(
    user_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
        sub: user_id.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::TokenEncoding)
}

/// Verify an access token under `secret` and return the embedded user id.
///
/// The signature is checked before any claim is trusted. Fails with
/// `InvalidSignature` if the token was not signed with `secret`, and with
/// `Expired` if the embedded expiry has passed.
pub fn verify_access_token(token: &str, secret: &str) -> Result<String, AuthError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Unauthenticated,
    })?;

    // The decoder only rejects exp strictly in the past; a token is already
    // invalid the instant now reaches exp
    if Utc::now().timestamp() >= data.claims.exp {
        return Err(AuthError::Expired);
    }

    Ok(data.claims.sub)
}

/// Read the *unverified* subject claim of a token.
///
/// The result must never be treated as an authenticated identity. Its only
/// legitimate use is selecting which user's secret to verify against; the
/// caller fails closed if that user cannot be resolved.
pub fn claimed_subject(token: &str) -> Result<String, AuthError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|_| AuthError::Unauthenticated)?;

    Ok(data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let secret = crate::auth::generator::generate_secret();
        let token = issue_access_token("user-1", &secret, Duration::minutes(15)).unwrap();

        let subject = verify_access_token(&token, &secret).unwrap();
        assert_eq!(subject, "user-1");
    }

    #[test]
    fn test_wrong_secret_fails_with_invalid_signature() {
        let token = issue_access_token("user-1", "secret-a", Duration::minutes(15)).unwrap();

        let err = verify_access_token(&token, "secret-b").unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_fails_with_expired() {
        let secret = "secret";
        let token = issue_access_token("user-1", secret, Duration::seconds(-120)).unwrap();

        let err = verify_access_token(&token, secret).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn test_token_is_invalid_the_moment_expiry_is_reached() {
        let secret = "secret";

        // exp == now: already expired, not a final valid second
        let token = issue_access_token("user-1", secret, Duration::zero()).unwrap();
        let err = verify_access_token(&token, secret).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let secret = "secret";
        let genuine = issue_access_token("user-1", secret, Duration::minutes(15)).unwrap();
        let other = issue_access_token("attacker", secret, Duration::minutes(15)).unwrap();

        // Splice the attacker's payload onto the genuine signature
        let genuine_parts: Vec<&str> = genuine.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!(
            "{}.{}.{}",
            genuine_parts[0], other_parts[1], genuine_parts[2]
        );

        assert!(verify_access_token(&forged, secret).is_err());
    }

    #[test]
    fn test_malformed_token_is_unauthenticated() {
        let err = verify_access_token("not-a-jwt", "secret").unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn test_claimed_subject_does_not_require_a_valid_signature() {
        let token = issue_access_token("user-1", "whatever", Duration::minutes(15)).unwrap();
        assert_eq!(claimed_subject(&token).unwrap(), "user-1");

        // Even an expired token still yields its claimed subject
        let stale = issue_access_token("user-2", "whatever", Duration::seconds(-120)).unwrap();
        assert_eq!(claimed_subject(&stale).unwrap(), "user-2");

        assert!(claimed_subject("garbage").is_err());
    }
}
