//! Password hashing and access tokens for administrators.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Admin;

/// Claims carried by an admin access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

/// Authentication service trait. Hashing is CPU-bound; callers run it on the
/// blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait AuthService: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String>;

    /// `Ok(false)` for a wrong password, `Err` only for a corrupt hash.
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool>;

    fn issue_token(&self, admin: &Admin, now: DateTime<Utc>) -> Result<String>;

    fn verify_token(&self, token: &str) -> std::result::Result<Claims, TokenError>;
}

/// Argon2id hashes and HS256 tokens.
pub struct JwtAuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl JwtAuthService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }
}

impl AuthService for JwtAuthService {
    fn hash_password(&self, password: &str) -> Result<String> {
        let mut salt = [0u8; 16];
        rand::rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt).map_err(|e| anyhow!("salt encoding: {e}"))?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing: {e}"))?;

        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("stored hash: {e}"))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("password verification: {e}")),
        }
    }

    fn issue_token(&self, admin: &Admin, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: admin.id,
            email: admin.email.clone(),
            username: admin.username.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + self.ttl_secs,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    fn verify_token(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
