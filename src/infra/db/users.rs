use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo, UsersWriteRepo};
use crate::domain::entities::UserRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, first_name, last_name, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, first_name, last_name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }
}

#[async_trait]
impl UsersWriteRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, first_name, last_name)
            VALUES ($1, $2, $3)
            RETURNING id, username, first_name, last_name, created_at
            "#,
        )
        .bind(params.username)
        .bind(params.first_name)
        .bind(params.last_name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }
}
