//! Domain service for the password-reset flow.
//!
//! A reset is requested by email, which mints a single-use token, and then
//! confirmed with that token and a new password. Confirming revokes every
//! session of the user.

use thiserror::Error;

use crate::domain::DomainError;
use crate::services::password_reset::PasswordResetToken;

#[derive(Debug, Error)]
pub enum PasswordResetError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid or unknown reset token")]
    InvalidToken,

    #[error("Reset token has expired")]
    ExpiredToken,

    #[error("Reset token has already been used")]
    TokenAlreadyUsed,

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PasswordResetError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::InvalidToken => "INVALID_RESET_TOKEN",
            Self::ExpiredToken => "EXPIRED_RESET_TOKEN",
            Self::TokenAlreadyUsed => "RESET_TOKEN_ALREADY_USED",
            Self::WeakPassword(_) => "WEAK_PASSWORD",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sea_orm::DbErr> for PasswordResetError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for PasswordResetError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait PasswordResetService: Send + Sync {
    /// Issues a fresh token for the account behind `email`, invalidating any
    /// earlier unused ones. The plaintext token is returned so the caller can
    /// deliver it.
    ///
    /// # Errors
    ///
    /// `InvalidEmailForPasswordReset` for malformed input and
    /// `UserNotFoundForPasswordReset` for unknown or inactive accounts, both
    /// as [`PasswordResetError::Domain`].
    async fn request_reset(&self, email: &str) -> Result<PasswordResetToken, PasswordResetError>;

    /// Consumes `token` and sets `new_password`. Returns the number of
    /// sessions that were revoked.
    async fn confirm_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<usize, PasswordResetError>;

    /// Deletes used and expired tokens. Returns how many were removed.
    async fn purge_stale_tokens(&self) -> Result<u64, PasswordResetError>;
}
