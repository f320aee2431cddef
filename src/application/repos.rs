//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PageWindow;
use crate::domain::entities::{
    CommentEntry, CommentRecord, GroupRecord, PostEntry, PostRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows.
    FollowedBy(i64),
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Fields an author may change; author and publish date are fixed.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError>;

    /// Posts in `scope`, newest first (`pub_date DESC, id DESC`).
    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostEntry>, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsWriteRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, oldest first.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError>;

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the edge; returns `false` when it already existed.
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Delete the edge; returns `false` when there was nothing to delete.
    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
