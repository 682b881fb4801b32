use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token payload: the principal plus standard expiry timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub login: String,
    pub nombres: String,
    pub nivel: i32,
    pub fkarea: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(login: String, nombres: String, nivel: i32, fkarea: Option<i32>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            login,
            nombres,
            nivel,
            fkarea,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("{0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, returning the embedded claims.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default()).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::InvalidToken("Token expirado".to_string()),
            _ => AuthError::InvalidToken("Token inválido".to_string()),
        }
    })?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// A malformed stored hash counts as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trip_preserves_principal() {
        let claims = Claims::new("jperez".into(), "Juan Pérez".into(), 3, Some(10), 24);
        let token = generate_jwt(&claims, "test-secret").unwrap();
        let decoded = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn jwt_rejects_wrong_secret_and_expired_tokens() {
        let claims = Claims::new("jperez".into(), "Juan Pérez".into(), 3, Some(10), 24);
        let token = generate_jwt(&claims, "test-secret").unwrap();
        assert!(matches!(validate_jwt(&token, "other"), Err(AuthError::InvalidToken(_))));

        let mut expired = claims.clone();
        expired.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&expired, "test-secret").unwrap();
        match validate_jwt(&token, "test-secret") {
            Err(AuthError::InvalidToken(msg)) => assert_eq!(msg, "Token expirado"),
            other => panic!("expected expired token error, got {:?}", other),
        }
    }

    #[test]
    fn empty_secret_is_refused() {
        let claims = Claims::new("a".into(), "A".into(), 1, None, 1);
        assert!(matches!(generate_jwt(&claims, ""), Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("s3creto").unwrap();
        assert!(verify_password("s3creto", &hash));
        assert!(!verify_password("otro", &hash));
        assert!(!verify_password("s3creto", "not-a-bcrypt-hash"));
    }
}
