mod read;
mod types;
mod write;

/// Columns selected for a post joined with its author and optional group.
pub(super) const POST_ENTRY_COLUMNS: &str = "p.id, p.text, p.pub_date, p.author_id, p.group_id, p.image, \
     u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, g.slug AS group_slug, g.title AS group_title";

pub(super) const POST_ENTRY_JOINS: &str =
    " JOIN users u ON u.id = p.author_id LEFT JOIN groups g ON g.id = p.group_id ";

