//! Signing and verification of stateless access tokens.
//!
//! Tokens are HS256 JWTs. Expiry is checked against the injected [`Clock`]
//! rather than the JWT library's own wall clock, so tests can step past
//! expiry without sleeping.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Role, UserId};
use crate::services::clock::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id as a decimal string.
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Session the token was minted for.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub jti: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<UserId, CodecError> {
        self.sub
            .parse()
            .map_err(|_| CodecError::Invalid(format!("non-numeric subject '{}'", self.sub)))
    }
}

/// Identity a token is minted for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenCodec: Send + Sync {
    fn sign(&self, subject: &TokenSubject, ttl: Duration) -> Result<IssuedToken, CodecError>;

    fn verify(&self, token: &str) -> Result<AccessClaims, CodecError>;
}

pub struct JwtTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl JwtTokenCodec {
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is evaluated against `clock` in `verify`.
        validation.validate_exp = false;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
            clock,
        }
    }
}

impl TokenCodec for JwtTokenCodec {
    fn sign(&self, subject: &TokenSubject, ttl: Duration) -> Result<IssuedToken, CodecError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + ttl;

        let claims = AccessClaims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            role: subject.role,
            sid: subject.session_id.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CodecError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, CodecError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| CodecError::Invalid(e.to_string()))?;

        if self.clock.now().timestamp() >= data.claims.exp {
            return Err(CodecError::Expired);
        }

        data.claims.user_id()?;
        Ok(data.claims)
    }
}
