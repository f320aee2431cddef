use time::OffsetDateTime;

use crate::domain::entities::{AuthorRef, GroupRef, PostEntry, PostRecord, display_name};

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) pub_date: OffsetDateTime,
    pub(crate) author_id: i64,
    pub(crate) group_id: Option<i64>,
    pub(crate) image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author_id: row.author_id,
            group_id: row.group_id,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostEntryRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) pub_date: OffsetDateTime,
    pub(crate) author_id: i64,
    pub(crate) group_id: Option<i64>,
    pub(crate) image: Option<String>,
    pub(crate) author_username: String,
    pub(crate) author_first_name: String,
    pub(crate) author_last_name: String,
    pub(crate) group_slug: Option<String>,
    pub(crate) group_title: Option<String>,
}

impl From<PostEntryRow> for PostEntry {
    fn from(row: PostEntryRow) -> Self {
        let author = AuthorRef {
            id: row.author_id,
            display_name: display_name(
                &row.author_username,
                &row.author_first_name,
                &row.author_last_name,
            ),
            username: row.author_username,
        };
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };

        Self {
            post: PostRecord {
                id: row.id,
                text: row.text,
                pub_date: row.pub_date,
                author_id: row.author_id,
                group_id: row.group_id,
                image: row.image,
            },
            author,
            group,
        }
    }
}
