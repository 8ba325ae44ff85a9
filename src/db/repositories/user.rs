use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{Email, Role, UserId};
use crate::entities::{prelude::Users, users};
use crate::services::credentials::UserRecord;

impl TryFrom<users::Model> for UserRecord {
    type Error = anyhow::Error;

    fn try_from(model: users::Model) -> Result<Self> {
        Ok(Self {
            id: UserId::new(model.id),
            email: Email::parse(&model.email)
                .with_context(|| format!("Stored email for user {} is invalid", model.id))?,
            name: model.name,
            password_hash: model.password_hash,
            role: model
                .role
                .parse::<Role>()
                .with_context(|| format!("Stored role for user {} is invalid", model.id))?,
            is_active: model.is_active,
        })
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        user.map(UserRecord::try_from).transpose()
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        let user = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(UserRecord::try_from).transpose()
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>> {
        Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?
            .into_iter()
            .map(UserRecord::try_from)
            .collect()
    }

    /// Inserts a user. The caller hashes the password.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: String,
        role: Role,
    ) -> Result<UserRecord> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            email: Set(email.as_str().to_string()),
            name: Set(name.to_string()),
            password_hash: Set(password_hash),
            role: Set(role.as_str().to_string()),
            is_active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .with_context(|| format!("Failed to insert user {email}"))?;

        UserRecord::try_from(model)
    }

    /// Returns false when no such user exists.
    pub async fn update_password_hash(&self, id: UserId, password_hash: String) -> Result<bool> {
        let result = Users::update_many()
            .col_expr(
                users::Column::PasswordHash,
                sea_orm::sea_query::Expr::value(password_hash),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to update password hash")?;

        Ok(result.rows_affected > 0)
    }

    /// Returns false when no such user exists.
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<bool> {
        let result = Users::update_many()
            .col_expr(
                users::Column::IsActive,
                sea_orm::sea_query::Expr::value(active),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to update user status")?;

        Ok(result.rows_affected > 0)
    }
}
