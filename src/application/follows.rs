//! Follow and unfollow commands.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    /// Users cannot follow themselves; nothing is written.
    SelfFollow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        viewer_id: i64,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if author.id == viewer_id {
            debug!(target = "yatube::follows", viewer_id, "self-follow ignored");
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follows.follow(viewer_id, author.id).await? {
            info!(
                target = "yatube::follows",
                viewer_id,
                author_id = author.id,
                "follow created"
            );
            Ok(FollowOutcome::Followed)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(
        &self,
        viewer_id: i64,
        username: &str,
    ) -> Result<UnfollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if self.follows.unfollow(viewer_id, author.id).await? {
            info!(
                target = "yatube::follows",
                viewer_id,
                author_id = author.id,
                "follow removed"
            );
            Ok(UnfollowOutcome::Unfollowed)
        } else {
            Ok(UnfollowOutcome::NotFollowing)
        }
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
