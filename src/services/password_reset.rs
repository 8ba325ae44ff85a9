//! Creation and expiry of single-use password-reset tokens.
//!
//! The manager only mints tokens and answers "is this expired". Remembering
//! which tokens were consumed is the job of the persistence layer.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::domain::UserId;
use crate::services::clock::Clock;
use crate::services::token_generator::{ALPHANUMERIC, RESET_TOKEN_LENGTH, TokenGenerator};

pub const DEFAULT_RESET_TOKEN_TTL_SECONDS: u64 = 60 * 60;

#[derive(Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for PasswordResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordResetToken")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct PasswordResetTokenManager {
    clock: Arc<dyn Clock>,
    generator: Arc<dyn TokenGenerator>,
    ttl: Duration,
}

impl PasswordResetTokenManager {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, generator: Arc<dyn TokenGenerator>, ttl: Duration) -> Self {
        Self {
            clock,
            generator,
            ttl,
        }
    }

    #[must_use]
    pub fn create(&self, user_id: UserId) -> PasswordResetToken {
        let created_at = self.clock.now();
        PasswordResetToken {
            token: self.generator.random_token(RESET_TOKEN_LENGTH, ALPHANUMERIC),
            user_id,
            created_at,
            expires_at: created_at + self.ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self, token: &PasswordResetToken) -> bool {
        self.is_past(token.expires_at)
    }

    /// Expiry check for a token loaded back from storage.
    #[must_use]
    pub fn is_past(&self, expires_at: DateTime<Utc>) -> bool {
        self.clock.now() > expires_at
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Lookup key under which a reset token is persisted. The plaintext token is
/// only ever handed to the user.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
