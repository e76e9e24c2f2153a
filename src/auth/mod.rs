pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Identity attached to a request once its bearer token verified.
///
/// Lives only as long as the request; handlers and guards read it, nothing
/// writes it after the authentication middleware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub identity: String,
    pub is_privileged: bool,
}

impl Principal {
    pub fn new(identity: impl Into<String>, is_privileged: bool) -> Self {
        Self {
            identity: identity.into(),
            is_privileged,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub username: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(username: impl Into<String>, is_admin: bool, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            username: username.into(),
            is_admin,
            exp,
            iat: now.timestamp(),
        }
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            identity: claims.username,
            is_privileged: claims.is_admin,
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Why a token did not yield a principal. Only ever logged.
#[derive(Debug, Error)]
#[error("token verification failed: {0}")]
pub struct VerificationFailure(pub String);

/// Turns a bearer token into a principal
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, VerificationFailure>;
}

/// HS256 signing and verification keys built from the configured secret
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry_hours: u64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            expiry_hours,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, JwtError> {
        Self::new(&security.jwt_secret, security.jwt_expiry_hours)
    }

    /// Sign a token for `username`
    pub fn create_token(&self, username: &str, is_admin: bool) -> Result<String, JwtError> {
        self.sign(&Claims::new(username, is_admin, self.expiry_hours))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }
}

impl TokenVerifier for JwtKeys {
    fn verify(&self, token: &str) -> Result<Principal, VerificationFailure> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| Principal::from(data.claims))
            .map_err(|e| VerificationFailure(e.to_string()))
    }
}
