use argon2::{
    password_hash::{PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use shared::domain::UserId;
use uuid::Uuid;

pub mod federated;

pub use federated::{FederatedIdentity, FederatedVerifier, GoogleTokenInfoVerifier};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("session token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("session token has a malformed subject")]
    MalformedSubject,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("federated token rejected: {0}")]
    FederatedRejected(String),
    #[error("federated provider unavailable: {0}")]
    FederatedUnavailable(String),
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<UserId, IdentityError> {
        self.sub
            .strip_prefix("user:")
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(UserId)
            .ok_or(IdentityError::MalformedSubject)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone)]
pub struct MintedSession {
    pub token: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

pub fn mint_session_token(
    cfg: &IdentityConfig,
    user_id: UserId,
) -> Result<MintedSession, IdentityError> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(cfg.ttl_seconds);
    let claims = SessionClaims {
        iss: cfg.issuer.clone(),
        sub: format!("user:{}", user_id.0),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )?;
    Ok(MintedSession {
        token,
        session_id: claims.jti,
        expires_at,
    })
}

/// Checks signature, issuer and expiry. Revocation is the caller's concern.
pub fn verify_session_token(
    cfg: &IdentityConfig,
    token: &str,
) -> Result<SessionClaims, IdentityError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[cfg.issuer.as_str()]);
    validation.leeway = 0;
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::PasswordHash(e.to_string()))
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
