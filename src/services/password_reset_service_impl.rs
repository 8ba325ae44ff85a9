//! `SeaORM` implementation of the `PasswordResetService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::domain::{DomainError, Email, UserId};
use crate::services::auth_service::{AuthSessionService, iso8601};
use crate::services::clock::Clock;
use crate::services::password;
use crate::services::password_reset::{PasswordResetToken, PasswordResetTokenManager, hash_token};
use crate::services::password_reset_service::{PasswordResetError, PasswordResetService};

pub struct SeaOrmPasswordResetService {
    store: Store,
    manager: PasswordResetTokenManager,
    clock: Arc<dyn Clock>,
    sessions: Arc<dyn AuthSessionService>,
    security: SecurityConfig,
    min_password_length: usize,
}

impl SeaOrmPasswordResetService {
    #[must_use]
    pub fn new(
        store: Store,
        manager: PasswordResetTokenManager,
        clock: Arc<dyn Clock>,
        sessions: Arc<dyn AuthSessionService>,
        security: SecurityConfig,
        min_password_length: usize,
    ) -> Self {
        Self {
            store,
            manager,
            clock,
            sessions,
            security,
            min_password_length,
        }
    }

    fn check_strength(&self, password: &str) -> Result<(), PasswordResetError> {
        if password.chars().count() < self.min_password_length {
            return Err(PasswordResetError::WeakPassword(format!(
                "must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

fn parse_stored_instant(value: &str) -> Result<DateTime<Utc>, PasswordResetError> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| PasswordResetError::Internal(format!("Corrupt timestamp '{value}': {e}")))
}

#[async_trait]
impl PasswordResetService for SeaOrmPasswordResetService {
    async fn request_reset(&self, email: &str) -> Result<PasswordResetToken, PasswordResetError> {
        let email = Email::parse(email)
            .map_err(|e| DomainError::invalid_email_for_password_reset(e.to_string()))?;

        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(DomainError::user_not_found_for_password_reset)?;

        let token = self.manager.create(user.id);
        let invalidated = self
            .store
            .issue_reset_token(
                hash_token(&token.token),
                user.id,
                iso8601(token.created_at),
                iso8601(token.expires_at),
            )
            .await?;

        info!(
            event = "password_reset_requested",
            user_id = %user.id,
            invalidated,
            "Password reset token issued"
        );

        Ok(token)
    }

    async fn confirm_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<usize, PasswordResetError> {
        let row = self
            .store
            .find_reset_token(&hash_token(token))
            .await?
            .ok_or(PasswordResetError::InvalidToken)?;

        if row.used_at.is_some() {
            warn!(event = "password_reset_failed", reason = "already_used", user_id = row.user_id, "Reset token reused");
            return Err(PasswordResetError::TokenAlreadyUsed);
        }

        if self.manager.is_past(parse_stored_instant(&row.expires_at)?) {
            info!(event = "password_reset_failed", reason = "expired", user_id = row.user_id, "Reset token expired");
            return Err(PasswordResetError::ExpiredToken);
        }

        let user_id = UserId::from(row.user_id);
        let active = self
            .store
            .get_user(user_id)
            .await?
            .is_some_and(|u| u.is_active);
        if !active {
            warn!(event = "password_reset_failed", reason = "inactive_account", user_id = %user_id, "Reset token belongs to an inactive account");
            return Err(PasswordResetError::InvalidToken);
        }

        self.check_strength(new_password)?;

        let password_hash =
            password::hash_password_blocking(new_password.to_string(), self.security.clone())
                .await?;

        let consumed = self
            .store
            .consume_reset_token(row.id, user_id, &iso8601(self.clock.now()), password_hash)
            .await?;

        if !consumed {
            warn!(event = "password_reset_failed", reason = "lost_race", user_id = %user_id, "Reset token consumed concurrently");
            return Err(PasswordResetError::TokenAlreadyUsed);
        }

        let revoked = self.sessions.logout_all(user_id);
        info!(
            event = "password_reset_completed",
            user_id = %user_id,
            revoked_sessions = revoked,
            "Password reset completed"
        );

        Ok(revoked)
    }

    async fn purge_stale_tokens(&self) -> Result<u64, PasswordResetError> {
        let purged = self
            .store
            .purge_stale_reset_tokens(&iso8601(self.clock.now()))
            .await?;

        if purged > 0 {
            info!(event = "reset_tokens_purged", purged, "Stale reset tokens purged");
        }
        Ok(purged)
    }
}
