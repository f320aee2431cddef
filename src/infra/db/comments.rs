use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::{AuthorRef, CommentEntry, CommentRecord, display_name};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    text: String,
    created: OffsetDateTime,
    author_id: i64,
    post_id: i64,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            created: row.created,
            author_id: row.author_id,
            post_id: row.post_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentEntryRow {
    #[sqlx(flatten)]
    comment: CommentRow,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
}

impl From<CommentEntryRow> for CommentEntry {
    fn from(row: CommentEntryRow) -> Self {
        let author = AuthorRef {
            id: row.comment.author_id,
            display_name: display_name(
                &row.author_username,
                &row.author_first_name,
                &row.author_last_name,
            ),
            username: row.author_username,
        };
        Self {
            comment: CommentRecord::from(row.comment),
            author,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError> {
        let rows = sqlx::query_as::<_, CommentEntryRow>(
            r#"
            SELECT c.id, c.text, c.created, c.author_id, c.post_id,
                   u.username AS author_username,
                   u.first_name AS author_first_name,
                   u.last_name AS author_last_name
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created, c.id
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentEntry::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (text, author_id, post_id)
            VALUES ($1, $2, $3)
            RETURNING id, text, created, author_id, post_id
            "#,
        )
        .bind(params.text)
        .bind(params.author_id)
        .bind(params.post_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}
