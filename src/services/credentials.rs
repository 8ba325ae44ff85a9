//! Read access to user credentials.
//!
//! The session service only ever looks users up and checks passwords through
//! [`CredentialStore`]; who owns the rows (`SQLite` via `SeaORM`, or the
//! in-memory store below) is not its concern.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::config::SecurityConfig;
use crate::domain::{Email, Role, UserId};
use crate::services::password;

/// A user as seen by the authentication core.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .finish()
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>>;

    async fn verify_password(&self, user: &UserRecord, password: &str) -> Result<bool> {
        password::verify_password_blocking(user.password_hash.clone(), password.to_string()).await
    }
}

/// Process-local credential store for demos and tests.
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    next_id: AtomicI32,
    security: SecurityConfig,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new(security: SecurityConfig) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(1),
            security,
        }
    }

    /// Adds an active user, hashing `password` with the store's argon2 params.
    pub fn provision(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<UserRecord> {
        let email = Email::parse(email)?;
        let password_hash = password::hash_password(password, Some(&self.security))?;

        let mut users = self.users.write();
        if users.values().any(|u| u.email == email) {
            anyhow::bail!("User with email {email} already exists");
        }

        let id = UserId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = UserRecord {
            id,
            email,
            name: name.to_string(),
            password_hash,
            role,
            is_active: true,
        };
        users.insert(id, record.clone());
        Ok(record)
    }

    /// Returns false when no such user exists.
    pub fn set_active(&self, id: UserId, active: bool) -> bool {
        self.users
            .write()
            .get_mut(&id)
            .map(|u| u.is_active = active)
            .is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.read().get(&id).cloned())
    }
}
