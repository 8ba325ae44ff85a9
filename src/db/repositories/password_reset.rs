use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::domain::UserId;
use crate::entities::{
    password_reset_tokens,
    prelude::{PasswordResetTokens, Users},
    users,
};

pub type PasswordResetRow = password_reset_tokens::Model;

pub struct PasswordResetRepository {
    conn: DatabaseConnection,
}

impl PasswordResetRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Marks every unused token of `user_id` as used and inserts the new one,
    /// in one transaction. Returns the number of tokens invalidated.
    pub async fn replace_for_user(
        &self,
        token_hash: String,
        user_id: UserId,
        created_at: String,
        expires_at: String,
    ) -> Result<u64> {
        let txn = self.conn.begin().await?;

        let invalidated = PasswordResetTokens::update_many()
            .col_expr(
                password_reset_tokens::Column::UsedAt,
                sea_orm::sea_query::Expr::value(Some(created_at.clone())),
            )
            .filter(password_reset_tokens::Column::UserId.eq(user_id.value()))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .exec(&txn)
            .await
            .context("Failed to invalidate earlier reset tokens")?;

        password_reset_tokens::ActiveModel {
            token_hash: Set(token_hash),
            user_id: Set(user_id.value()),
            created_at: Set(created_at),
            expires_at: Set(expires_at),
            used_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to store password reset token")?;

        txn.commit().await?;
        Ok(invalidated.rows_affected)
    }

    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetRow>> {
        PasswordResetTokens::find()
            .filter(password_reset_tokens::Column::TokenHash.eq(token_hash))
            .one(&self.conn)
            .await
            .context("Failed to query password reset token")
    }

    /// Consumes the token and stores the new password hash in one transaction.
    ///
    /// Returns false, changing nothing, when another caller consumed the
    /// token first.
    pub async fn consume_and_set_password(
        &self,
        token_id: i32,
        user_id: UserId,
        used_at: &str,
        password_hash: String,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let consumed = PasswordResetTokens::update_many()
            .col_expr(
                password_reset_tokens::Column::UsedAt,
                sea_orm::sea_query::Expr::value(Some(used_at.to_string())),
            )
            .filter(password_reset_tokens::Column::Id.eq(token_id))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .exec(&txn)
            .await
            .context("Failed to consume reset token")?;

        if consumed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let updated = Users::update_many()
            .col_expr(
                users::Column::PasswordHash,
                sea_orm::sea_query::Expr::value(password_hash),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(used_at.to_string()),
            )
            .filter(users::Column::Id.eq(user_id.value()))
            .exec(&txn)
            .await
            .context("Failed to store new password")?;

        if updated.rows_affected == 0 {
            txn.rollback().await?;
            anyhow::bail!("User {user_id} vanished while resetting password");
        }

        txn.commit().await?;
        Ok(true)
    }

    /// Deletes tokens that were used or expired before `now`.
    pub async fn purge_stale(&self, now: &str) -> Result<u64> {
        let result = PasswordResetTokens::delete_many()
            .filter(
                Condition::any()
                    .add(password_reset_tokens::Column::UsedAt.is_not_null())
                    .add(password_reset_tokens::Column::ExpiresAt.lt(now)),
            )
            .exec(&self.conn)
            .await
            .context("Failed to purge stale reset tokens")?;

        Ok(result.rows_affected)
    }
}
