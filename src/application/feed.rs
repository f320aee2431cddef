//! Read-side listings: the home index, group and profile pages, the follow
//! feed and the post detail page.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("unknown post `{0}`")]
    UnknownPost(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupListing {
    pub group: GroupRecord,
    pub page: Page<PostEntry>,
}

#[derive(Debug, Clone)]
pub struct ProfileListing {
    pub author: UserRecord,
    pub post_count: u64,
    /// Whether the viewer follows this author; `false` for anonymous or self.
    pub following: bool,
    pub is_self: bool,
    pub page: Page<PostEntry>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub entry: PostEntry,
    pub author_post_count: u64,
    pub comments: Vec<CommentEntry>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
        }
    }

    async fn page(
        &self,
        scope: PostScope,
        request: PageRequest,
    ) -> Result<Page<PostEntry>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let window = request.resolve(total);
        let items = if total == 0 {
            Vec::new()
        } else {
            self.posts.list_posts(scope, window).await?
        };
        Ok(window.into_page(items))
    }

    /// Every post, newest first.
    pub async fn index(&self, request: PageRequest) -> Result<Page<PostEntry>, FeedError> {
        self.page(PostScope::All, request).await
    }

    pub async fn group_listing(
        &self,
        slug: &str,
        request: PageRequest,
    ) -> Result<GroupListing, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = self.page(PostScope::Group(group.id), request).await?;
        Ok(GroupListing { group, page })
    }

    pub async fn profile_listing(
        &self,
        username: &str,
        viewer_id: Option<i64>,
        request: PageRequest,
    ) -> Result<ProfileListing, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let page = self.page(PostScope::Author(author.id), request).await?;
        let is_self = viewer_id == Some(author.id);
        let following = match viewer_id {
            Some(viewer) if !is_self => self.follows.is_following(viewer, author.id).await?,
            _ => false,
        };

        Ok(ProfileListing {
            post_count: page.total,
            author,
            following,
            is_self,
            page,
        })
    }

    /// Posts by the authors `viewer_id` follows. Following nobody yields an
    /// empty page.
    pub async fn follow_feed(
        &self,
        viewer_id: i64,
        request: PageRequest,
    ) -> Result<Page<PostEntry>, FeedError> {
        self.page(PostScope::FollowedBy(viewer_id), request).await
    }

    /// `raw_id` comes straight from the path; non-numeric ids are unknown.
    pub async fn post_detail(&self, raw_id: &str) -> Result<PostDetail, FeedError> {
        let unknown = || FeedError::UnknownPost(raw_id.to_string());
        let id = parse_post_id(raw_id).ok_or_else(unknown)?;
        let entry = self.posts.find_post(id).await?.ok_or_else(unknown)?;
        let author_post_count = self
            .posts
            .count_posts(PostScope::Author(entry.author.id))
            .await?;
        let comments = self.comments.list_for_post(id).await?;

        Ok(PostDetail {
            entry,
            author_post_count,
            comments,
        })
    }
}

pub fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}
