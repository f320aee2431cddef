use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::pagination::PageWindow;
use crate::application::repos::{PostScope, PostsRepo, RepoError};
use crate::domain::entities::PostEntry;
use crate::infra::db::map_sqlx_error;

use super::super::PostgresRepositories;
use super::types::PostEntryRow;
use super::{POST_ENTRY_COLUMNS, POST_ENTRY_JOINS};

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p");
        Self::apply_post_scope(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_ENTRY_COLUMNS);
        qb.push(" FROM posts p");
        qb.push(POST_ENTRY_JOINS);
        Self::apply_post_scope(&mut qb, scope);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(window.limit());
        qb.push(" OFFSET ");
        qb.push_bind(window.offset());

        let rows = qb
            .build_query_as::<PostEntryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostEntry::from).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_ENTRY_COLUMNS);
        qb.push(" FROM posts p");
        qb.push(POST_ENTRY_JOINS);
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostEntryRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostEntry::from))
    }
}
