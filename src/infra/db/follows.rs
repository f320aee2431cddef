use async_trait::async_trait;

use crate::application::repos::{FollowsRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(inserted.is_some())
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
