//! Domain service for session and token lifecycle.
//!
//! Handles login, access-token refresh and validation, logout, and session
//! introspection. Every timestamp leaving this module is an ISO-8601 string
//! and every duration is in seconds.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{Role, UserId};
use crate::services::credentials::UserRecord;
use crate::services::session_registry::Session;
use crate::services::token_codec::CodecError;

/// Errors specific to authentication operations.
///
/// Not-found and expired are kept apart here for logging; the HTTP layer
/// folds them into a single response per token kind.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    ExpiredRefreshToken,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Access token expired")]
    ExpiredToken,

    #[error("Session has been revoked")]
    SessionRevoked,

    #[error("Credential store error: {0}")]
    CredentialStore(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::ExpiredRefreshToken => "EXPIRED_REFRESH_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::SessionRevoked => "SESSION_REVOKED",
            Self::CredentialStore(_) => "CREDENTIAL_STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Invalid(_) => Self::InvalidToken,
            CodecError::Expired => Self::ExpiredToken,
            CodecError::Signing(msg) => Self::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Lifetimes of the two token kinds.
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    /// Measured from session creation; refreshing does not extend it.
    pub refresh_ttl: Duration,
}

/// Upper bound on any configured lifetime (ten years).
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Converts a configured lifetime, clamped to [`MAX_TTL_SECONDS`].
#[must_use]
pub fn ttl_from_seconds(seconds: u64) -> Duration {
    Duration::seconds(i64::try_from(seconds.min(MAX_TTL_SECONDS)).unwrap_or_default())
}

impl TokenPolicy {
    #[must_use]
    pub fn from_seconds(access_ttl_seconds: u64, refresh_ttl_seconds: u64) -> Self {
        Self {
            access_ttl: ttl_from_seconds(access_ttl_seconds),
            refresh_ttl: ttl_from_seconds(refresh_ttl_seconds),
        }
    }
}

/// Where a request came from, recorded on the session for auditing.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

/// Sanitized user projection. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDescriptor {
    pub session_id: String,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh-token lifetime in seconds.
    pub refresh_expires_in: i64,
    pub session: SessionDescriptor,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionActivity {
    pub session_id: String,
    pub last_used: String,
}

/// Result of a successful access-token validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedSession {
    pub user: UserProfile,
    pub session: SessionActivity,
}

/// Session metadata for introspection. The refresh token is never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: UserId,
    pub created_at: String,
    pub last_used_at: String,
    pub expires_at: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl SessionInfo {
    #[must_use]
    pub fn from_session(session: &Session, refresh_ttl: Duration) -> Self {
        Self {
            session_id: session.session_id().to_string(),
            user_id: session.user_id,
            created_at: iso8601(session.created_at),
            last_used_at: iso8601(session.last_used_at),
            expires_at: iso8601(session.created_at + refresh_ttl),
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub user_id: UserId,
    pub session_id: String,
    pub last_used: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl From<&Session> for ActivityRecord {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            session_id: session.session_id().to_string(),
            last_used: iso8601(session.last_used_at),
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub total_active_sessions: usize,
    pub sessions_per_user: BTreeMap<UserId, usize>,
    /// Most recent activity first.
    pub last_activity: Vec<ActivityRecord>,
}

/// Formats an instant the way every response in this crate does.
#[must_use]
pub fn iso8601(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Domain service trait for the session/token lifecycle.
#[async_trait::async_trait]
pub trait AuthSessionService: Send + Sync {
    /// Verifies credentials and opens a new session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for unknown emails, inactive
    /// accounts and wrong passwords alike.
    async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientContext,
    ) -> Result<LoginResult, AuthError>;

    /// Mints a new access token for the session owning `refresh_token`.
    /// The refresh token itself stays the same.
    async fn refresh_token(
        &self,
        refresh_token: &str,
        ip_address: &str,
    ) -> Result<RefreshResult, AuthError>;

    /// Checks signature, expiry and that the token's session is still live.
    async fn validate_access_token(&self, token: &str) -> Result<ValidatedSession, AuthError>;

    /// Idempotent. Returns whether a session was removed.
    fn logout(&self, session_id: &str) -> bool;

    /// Removes every session of `user_id`, returning how many were removed.
    fn logout_all(&self, user_id: UserId) -> usize;

    /// Removes every session of `user_id` except `keep_session_id`.
    fn logout_others(&self, user_id: UserId, keep_session_id: &str) -> usize;

    fn session_stats(&self) -> SessionStats;

    fn active_sessions(&self) -> Vec<SessionInfo>;

    fn sessions_for_user(&self, user_id: UserId) -> Vec<SessionInfo>;

    fn clear_all_sessions(&self) -> usize;

    /// Drops sessions whose refresh token has passed its absolute expiry.
    fn purge_expired_sessions(&self) -> usize;
}
