//! Write-side commands for posts and comments.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::application::feed::parse_post_id;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostEntry, PostRecord};
use crate::domain::forms::{CommentForm, FieldErrors, INVALID_CHOICE_MESSAGE, PostForm};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("invalid post: {0}")]
    Invalid(FieldErrors),
    #[error("unknown post `{0}`")]
    NotFound(String),
    #[error("user {viewer_id} may not edit post {post_id}")]
    Forbidden { post_id: i64, viewer_id: i64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub enum CommentOutcome {
    Added(CommentRecord),
    /// Nothing was written; the caller sends the user back to the post.
    Rejected { post_id: i64, errors: FieldErrors },
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            groups,
            comments,
        }
    }

    /// Groups offered by the post form, in title order.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create_post(
        &self,
        author_id: i64,
        input: &HashMap<String, String>,
    ) -> Result<PostRecord, PostError> {
        let form = self.clean_post_form(input).await?;
        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id,
                text: form.text,
                group_id: form.group_id,
                image: form.image,
            })
            .await?;

        info!(target = "yatube::posts", post_id = post.id, author_id, "post created");
        Ok(post)
    }

    /// Load a post for editing, enforcing authorship.
    pub async fn edit_form(&self, viewer_id: i64, raw_id: &str) -> Result<PostEntry, PostError> {
        let entry = self.load(raw_id).await?;
        ensure_author(&entry, viewer_id)?;
        Ok(entry)
    }

    #[instrument(skip(self, input))]
    pub async fn update_post(
        &self,
        viewer_id: i64,
        raw_id: &str,
        input: &HashMap<String, String>,
    ) -> Result<PostRecord, PostError> {
        let entry = self.load(raw_id).await?;
        ensure_author(&entry, viewer_id)?;

        let form = self.clean_post_form(input).await?;
        // An omitted image field keeps the stored reference; an empty one clears it.
        let image = if input.contains_key("image") {
            form.image
        } else {
            entry.post.image
        };
        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: entry.post.id,
                text: form.text,
                group_id: form.group_id,
                image,
            })
            .await?;

        info!(target = "yatube::posts", post_id = post.id, "post updated");
        Ok(post)
    }

    #[instrument(skip(self, input))]
    pub async fn add_comment(
        &self,
        viewer_id: i64,
        raw_id: &str,
        input: &HashMap<String, String>,
    ) -> Result<CommentOutcome, PostError> {
        let entry = self.load(raw_id).await?;
        let post_id = entry.post.id;

        let form = match CommentForm::parse(input) {
            Ok(form) => form,
            Err(errors) => return Ok(CommentOutcome::Rejected { post_id, errors }),
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: viewer_id,
                text: form.text,
            })
            .await?;

        info!(
            target = "yatube::posts",
            post_id,
            comment_id = comment.id,
            "comment added"
        );
        Ok(CommentOutcome::Added(comment))
    }

    async fn load(&self, raw_id: &str) -> Result<PostEntry, PostError> {
        let not_found = || PostError::NotFound(raw_id.to_string());
        let id = parse_post_id(raw_id).ok_or_else(not_found)?;
        self.reader.find_post(id).await?.ok_or_else(not_found)
    }

    async fn clean_post_form(
        &self,
        input: &HashMap<String, String>,
    ) -> Result<PostForm, PostError> {
        let form = PostForm::parse(input).map_err(PostError::Invalid)?;
        if let Some(group_id) = form.group_id
            && self.groups.find_by_id(group_id).await?.is_none()
        {
            return Err(PostError::Invalid(FieldErrors::single(
                "group",
                INVALID_CHOICE_MESSAGE,
            )));
        }
        Ok(form)
    }
}

fn ensure_author(entry: &PostEntry, viewer_id: i64) -> Result<(), PostError> {
    if entry.post.author_id == viewer_id {
        Ok(())
    } else {
        Err(PostError::Forbidden {
            post_id: entry.post.id,
            viewer_id,
        })
    }
}
