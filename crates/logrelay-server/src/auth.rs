//! Viewer authentication

use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("token does not grant admin access")]
    NotAdmin,

    #[error("token carries no username")]
    MissingUsername,

    #[error("no JWT secret configured")]
    NoSecret,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    username: Option<String>,
}

/// An authenticated viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
}

/// Checks HS256 tokens signed with the shared secret.
///
/// An empty secret rejects every token: anyone can sign with an empty key.
pub struct TokenVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is honoured when present but not required
        validation.required_spec_claims = HashSet::new();
        Self {
            key: (!secret.is_empty()).then(|| DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn verify(&self, token: &str) -> Result<Session, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::NoSecret)?;
        let claims = decode::<Claims>(token, key, &self.validation)?.claims;
        if !claims.admin {
            return Err(AuthError::NotAdmin);
        }
        match claims.username {
            Some(username) if !username.is_empty() => Ok(Session { username }),
            _ => Err(AuthError::MissingUsername),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    pub(crate) fn token(secret: &str, claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_admin_token() {
        let verifier = TokenVerifier::new("s3cr3t");
        let session = verifier
            .verify(&token("s3cr3t", json!({"admin": true, "username": "alice"})))
            .unwrap();
        assert_eq!(session.username, "alice");
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = TokenVerifier::new("s3cr3t");
        let err = verifier
            .verify(&token("other", json!({"admin": true, "username": "alice"})))
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
    }

    #[test]
    fn test_non_admin() {
        let verifier = TokenVerifier::new("s3cr3t");
        let err = verifier
            .verify(&token("s3cr3t", json!({"admin": false, "username": "bob"})))
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAdmin));

        let err = verifier
            .verify(&token("s3cr3t", json!({"username": "bob"})))
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAdmin));
    }

    #[test]
    fn test_missing_username() {
        let verifier = TokenVerifier::new("s3cr3t");
        let err = verifier
            .verify(&token("s3cr3t", json!({"admin": true})))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingUsername));
    }

    #[test]
    fn test_expired_token() {
        let verifier = TokenVerifier::new("s3cr3t");
        let err = verifier
            .verify(&token(
                "s3cr3t",
                json!({"admin": true, "username": "alice", "exp": 1_000_000}),
            ))
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
    }

    #[test]
    fn test_empty_secret_rejects_everything() {
        let verifier = TokenVerifier::new("");
        assert!(!verifier.is_enabled());
        let err = verifier
            .verify(&token("", json!({"admin": true, "username": "mallory"})))
            .unwrap_err();
        assert!(matches!(err, AuthError::NoSecret));
    }

    #[test]
    fn test_garbage() {
        let verifier = TokenVerifier::new("s3cr3t");
        assert!(verifier.verify("not-a-jwt").is_err());
    }
}
