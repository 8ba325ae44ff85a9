//! Domain service for user accounts: provisioning, listing, activation and
//! password changes.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{DomainError, Role, UserId};
use crate::services::auth_service::UserProfile;
use crate::services::credentials::UserRecord;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User not found")]
    UserNotFound,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Current password is incorrect")]
    InvalidCurrentPassword,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),
}

impl AccountError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidCurrentPassword => "INVALID_CURRENT_PASSWORD",
            Self::Domain(e) => e.code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Administrative view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<&UserRecord> for AccountSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
            name: user.name.clone(),
            role: user.role,
            is_active: user.is_active,
        }
    }
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    async fn profile(&self, user_id: UserId) -> Result<UserProfile, AccountError>;

    /// Verifies `current_password`, stores `new_password` and revokes every
    /// other session of the user. `keep_session_id` survives.
    ///
    /// Returns how many sessions were revoked.
    async fn change_password(
        &self,
        user_id: UserId,
        keep_session_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<usize, AccountError>;

    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<AccountSummary, AccountError>;

    async fn list_users(&self) -> Result<Vec<AccountSummary>, AccountError>;

    /// Enables or disables an account. Disabling revokes its sessions.
    async fn set_active(&self, email: &str, active: bool) -> Result<AccountSummary, AccountError>;
}
