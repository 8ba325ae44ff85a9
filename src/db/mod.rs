use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{Email, Role, UserId};
use crate::services::credentials::{CredentialStore, UserRecord};

pub mod migrator;
pub mod repositories;

pub use repositories::password_reset::PasswordResetRow;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    /// Single-connection in-memory database, used by tests and demos.
    pub async fn in_memory() -> Result<Self> {
        Self::with_pool_options("sqlite::memory:", 1, 1).await
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    // ========== User Repository Methods ==========

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn password_reset_repo(&self) -> repositories::password_reset::PasswordResetRepository {
        repositories::password_reset::PasswordResetRepository::new(self.conn.clone())
    }

    pub async fn get_user_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        self.user_repo().list().await
    }

    pub async fn create_user(
        &self,
        email: &Email,
        name: &str,
        password_hash: String,
        role: Role,
    ) -> Result<UserRecord> {
        self.user_repo()
            .create(email, name, password_hash, role)
            .await
    }

    pub async fn update_user_password_hash(
        &self,
        id: UserId,
        password_hash: String,
    ) -> Result<bool> {
        self.user_repo()
            .update_password_hash(id, password_hash)
            .await
    }

    pub async fn set_user_active(&self, id: UserId, active: bool) -> Result<bool> {
        self.user_repo().set_active(id, active).await
    }

    // ========== Password Reset Repository Methods ==========

    /// Stores a new reset token, invalidating the user's earlier unused ones.
    pub async fn issue_reset_token(
        &self,
        token_hash: String,
        user_id: UserId,
        created_at: String,
        expires_at: String,
    ) -> Result<u64> {
        self.password_reset_repo()
            .replace_for_user(token_hash, user_id, created_at, expires_at)
            .await
    }

    pub async fn find_reset_token(&self, token_hash: &str) -> Result<Option<PasswordResetRow>> {
        self.password_reset_repo().find_by_hash(token_hash).await
    }

    pub async fn consume_reset_token(
        &self,
        token_id: i32,
        user_id: UserId,
        used_at: &str,
        password_hash: String,
    ) -> Result<bool> {
        self.password_reset_repo()
            .consume_and_set_password(token_id, user_id, used_at, password_hash)
            .await
    }

    pub async fn purge_stale_reset_tokens(&self, now: &str) -> Result<u64> {
        self.password_reset_repo().purge_stale(now).await
    }
}

#[async_trait]
impl CredentialStore for Store {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        self.get_user_by_email(email).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        self.get_user(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn users_round_trip_through_sqlite() {
        let store = Store::in_memory().await.unwrap();
        let email = Email::parse("alice@example.com").unwrap();

        let created = store
            .create_user(&email, "Alice", "hash".to_string(), Role::Manager)
            .await
            .unwrap();
        assert!(created.is_active);

        let found = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.role, Role::Manager);

        assert!(store.set_user_active(created.id, false).await.unwrap());
        assert!(!store.get_user(created.id).await.unwrap().unwrap().is_active);
        assert!(!store.set_user_active(UserId::new(999), false).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_violates_unique_index() {
        let store = Store::in_memory().await.unwrap();
        let email = Email::parse("alice@example.com").unwrap();

        store
            .create_user(&email, "Alice", "hash".to_string(), Role::User)
            .await
            .unwrap();
        assert!(
            store
                .create_user(&email, "Alice again", "hash".to_string(), Role::User)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn reset_token_is_consumed_once() {
        let store = Store::in_memory().await.unwrap();
        let email = Email::parse("alice@example.com").unwrap();
        let user = store
            .create_user(&email, "Alice", "old".to_string(), Role::User)
            .await
            .unwrap();

        store
            .issue_reset_token(
                "deadbeef".to_string(),
                user.id,
                "2026-03-01T10:00:00.000Z".to_string(),
                "2026-03-01T11:00:00.000Z".to_string(),
            )
            .await
            .unwrap();
        let row = store.find_reset_token("deadbeef").await.unwrap().unwrap();

        let now = "2026-03-01T10:05:00.000Z";
        assert!(
            store
                .consume_reset_token(row.id, user.id, now, "new".to_string())
                .await
                .unwrap()
        );
        assert!(
            !store
                .consume_reset_token(row.id, user.id, now, "newer".to_string())
                .await
                .unwrap()
        );

        let reloaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new");
        assert!(
            store
                .find_reset_token("deadbeef")
                .await
                .unwrap()
                .unwrap()
                .used_at
                .is_some()
        );
    }

    #[tokio::test]
    async fn issuing_a_token_invalidates_earlier_ones() {
        let store = Store::in_memory().await.unwrap();
        let email = Email::parse("alice@example.com").unwrap();
        let user = store
            .create_user(&email, "Alice", "old".to_string(), Role::User)
            .await
            .unwrap();

        for (hash, created, invalidated) in [
            ("first", "2026-03-01T10:00:00.000Z", 0),
            ("second", "2026-03-01T10:01:00.000Z", 1),
        ] {
            let count = store
                .issue_reset_token(
                    hash.to_string(),
                    user.id,
                    created.to_string(),
                    "2026-03-01T11:00:00.000Z".to_string(),
                )
                .await
                .unwrap();
            assert_eq!(count, invalidated);
        }

        let first = store.find_reset_token("first").await.unwrap().unwrap();
        assert_eq!(first.used_at.as_deref(), Some("2026-03-01T10:01:00.000Z"));
        let second = store.find_reset_token("second").await.unwrap().unwrap();
        assert!(second.used_at.is_none());
    }

    #[tokio::test]
    async fn purge_removes_used_and_expired_tokens() {
        let store = Store::in_memory().await.unwrap();
        let alice = store
            .create_user(
                &Email::parse("alice@example.com").unwrap(),
                "Alice",
                "old".to_string(),
                Role::User,
            )
            .await
            .unwrap();
        let bob = store
            .create_user(
                &Email::parse("bob@example.com").unwrap(),
                "Bob",
                "old".to_string(),
                Role::User,
            )
            .await
            .unwrap();

        for (hash, user_id, expires) in [
            ("superseded", alice.id, "2026-03-01T11:00:00.000Z"),
            ("live", alice.id, "2026-03-01T11:00:00.000Z"),
            ("expired", bob.id, "2026-03-01T09:00:00.000Z"),
        ] {
            store
                .issue_reset_token(
                    hash.to_string(),
                    user_id,
                    "2026-03-01T08:30:00.000Z".to_string(),
                    expires.to_string(),
                )
                .await
                .unwrap();
        }

        let purged = store
            .purge_stale_reset_tokens("2026-03-01T10:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(purged, 2);
        assert!(store.find_reset_token("live").await.unwrap().is_some());
        assert!(store.find_reset_token("superseded").await.unwrap().is_none());
    }
}
