//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::domain::{Email, Role, UserId};
use crate::services::account_service::{AccountError, AccountService, AccountSummary};
use crate::services::auth_service::{AuthSessionService, UserProfile};
use crate::services::credentials::{CredentialStore, UserRecord};
use crate::services::password;

pub struct SeaOrmAccountService {
    store: Store,
    sessions: Arc<dyn AuthSessionService>,
    security: SecurityConfig,
    min_password_length: usize,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(
        store: Store,
        sessions: Arc<dyn AuthSessionService>,
        security: SecurityConfig,
        min_password_length: usize,
    ) -> Self {
        Self {
            store,
            sessions,
            security,
            min_password_length,
        }
    }

    fn validate_password(&self, password: &str) -> Result<(), AccountError> {
        if password.chars().count() < self.min_password_length {
            return Err(AccountError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }

    async fn user(&self, user_id: UserId) -> Result<UserRecord, AccountError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    async fn user_by_email(&self, email: &str) -> Result<UserRecord, AccountError> {
        let email = Email::parse(email)?;
        self.store
            .get_user_by_email(&email)
            .await?
            .ok_or(AccountError::UserNotFound)
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn profile(&self, user_id: UserId) -> Result<UserProfile, AccountError> {
        let user = self.user(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    async fn change_password(
        &self,
        user_id: UserId,
        keep_session_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<usize, AccountError> {
        self.validate_password(new_password)?;
        if current_password == new_password {
            return Err(AccountError::Validation(
                "New password must differ from the current one".to_string(),
            ));
        }

        let user = self.user(user_id).await?;
        if !self.store.verify_password(&user, current_password).await? {
            warn!(event = "password_change_failed", user_id = %user_id, "Current password mismatch");
            return Err(AccountError::InvalidCurrentPassword);
        }

        let password_hash =
            password::hash_password_blocking(new_password.to_string(), self.security.clone())
                .await?;

        if !self
            .store
            .update_user_password_hash(user_id, password_hash)
            .await?
        {
            return Err(AccountError::UserNotFound);
        }

        let revoked = self.sessions.logout_others(user_id, keep_session_id);
        info!(
            event = "password_changed",
            user_id = %user_id,
            revoked_sessions = revoked,
            "Password changed"
        );
        Ok(revoked)
    }

    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<AccountSummary, AccountError> {
        let email = Email::parse(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountError::Validation("Name cannot be empty".to_string()));
        }
        self.validate_password(password)?;

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let password_hash =
            password::hash_password_blocking(password.to_string(), self.security.clone()).await?;
        let user = self
            .store
            .create_user(&email, name, password_hash, role)
            .await?;

        info!(event = "user_created", user_id = %user.id, role = %user.role, "User created");
        Ok(AccountSummary::from(&user))
    }

    async fn list_users(&self) -> Result<Vec<AccountSummary>, AccountError> {
        let users = self.store.list_users().await?;
        Ok(users.iter().map(AccountSummary::from).collect())
    }

    async fn set_active(&self, email: &str, active: bool) -> Result<AccountSummary, AccountError> {
        let mut user = self.user_by_email(email).await?;
        self.store.set_user_active(user.id, active).await?;
        user.is_active = active;

        if active {
            info!(event = "user_enabled", user_id = %user.id, "User enabled");
        } else {
            let revoked = self.sessions.logout_all(user.id);
            info!(event = "user_disabled", user_id = %user.id, revoked_sessions = revoked, "User disabled");
        }

        Ok(AccountSummary::from(&user))
    }
}
