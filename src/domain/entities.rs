//! Domain entities mirrored from persistent storage.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

/// Number of characters shown when a post or comment is printed.
pub const DISPLAY_PREVIEW_CHARS: usize = 15;

pub const USERNAME_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    /// Full name when one is known, the username otherwise.
    pub fn display_name(&self) -> String {
        display_name(&self.username, &self.first_name, &self.last_name)
    }

    pub fn as_author(&self) -> AuthorRef {
        AuthorRef {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl GroupRecord {
    pub fn as_ref(&self) -> GroupRef {
        GroupRef {
            id: self.id,
            slug: self.slug.clone(),
            title: self.title.clone(),
        }
    }
}

impl fmt::Display for GroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&preview(&self.text))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub text: String,
    pub created: OffsetDateTime,
    pub author_id: i64,
    pub post_id: i64,
}

impl fmt::Display for CommentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&preview(&self.text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowRecord {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
}

/// The author columns joined onto posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRef {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

/// The group columns joined onto posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

/// A post together with its author and optional group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostEntry {
    pub post: PostRecord,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEntry {
    pub comment: CommentRecord,
    pub author: AuthorRef,
}

pub fn display_name(username: &str, first_name: &str, last_name: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

/// Usernames are letters, digits and `_ . @ + -`, at most
/// [`USERNAME_MAX_CHARS`] characters.
pub fn is_valid_username(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= USERNAME_MAX_CHARS
        && value
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '@' | '+' | '-'))
}

fn preview(text: &str) -> String {
    text.chars().take(DISPLAY_PREVIEW_CHARS).collect()
}
