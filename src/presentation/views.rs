use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupListing, PostDetail, ProfileListing};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry};
use crate::domain::forms::{FieldErrors, POST_SCHEMA};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year] [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Render the error page. Falls back to plain text if the template itself
/// fails, so error rendering never recurses.
pub fn render_error_response(status: StatusCode, message: &str) -> Response {
    let content = ErrorPageView::new(status, message);
    let view = LayoutContext::new(content.title.clone(), None, content);
    match (ErrorTemplate { view }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            let mut response = (status, message.to_string()).into_response();
            ErrorReport::from_error(
                "presentation::views::render_error_response",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

pub fn render_not_found_response() -> Response {
    let mut response = render_error_response(StatusCode::NOT_FOUND, "Page not found");
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Page frame shared by every template.
#[derive(Clone)]
pub struct LayoutContext<T> {
    pub title: String,
    /// Username of the signed-in viewer. Always `None` on cached pages.
    pub viewer: Option<String>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(title: impl Into<String>, viewer: Option<String>, content: T) -> Self {
        Self {
            title: title.into(),
            viewer,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub published: String,
    pub iso_date: String,
    pub author_username: String,
    pub author_name: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image: Option<String>,
}

impl From<PostEntry> for PostCard {
    fn from(entry: PostEntry) -> Self {
        let PostEntry {
            post,
            author,
            group,
        } = entry;
        let (group_slug, group_title) = match group {
            Some(group) => (Some(group.slug), Some(group.title)),
            None => (None, None),
        };

        Self {
            id: post.id,
            published: format_date(post.pub_date),
            iso_date: iso_date(post.pub_date),
            text: post.text,
            author_username: author.username,
            author_name: author.display_name,
            group_slug,
            group_title,
            image: post.image,
        }
    }
}

/// Previous/next links for a paginated listing.
#[derive(Clone)]
pub struct PaginationView {
    pub number: u32,
    pub num_pages: u32,
    pub show: bool,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

pub struct ListingView {
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl ListingView {
    pub fn from_page(page: Page<PostEntry>) -> Self {
        let pagination = PaginationView {
            number: page.number,
            num_pages: page.num_pages,
            show: page.has_other_pages(),
            previous: page.previous_page_number(),
            next: page.next_page_number(),
        };
        Self {
            posts: page.items.into_iter().map(PostCard::from).collect(),
            pagination,
        }
    }
}

/// The home index and the follow feed: a heading over a listing.
pub struct FeedView {
    pub heading: String,
    pub listing: ListingView,
}

impl FeedView {
    pub fn new(heading: impl Into<String>, page: Page<PostEntry>) -> Self {
        Self {
            heading: heading.into(),
            listing: ListingView::from_page(page),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedView>,
}

pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub listing: ListingView,
}

impl From<GroupListing> for GroupView {
    fn from(listing: GroupListing) -> Self {
        let GroupListing { group, page } = listing;
        Self {
            title: group.title,
            slug: group.slug,
            description: group.description,
            listing: ListingView::from_page(page),
        }
    }
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub following: bool,
    /// Follow controls are shown to signed-in viewers on someone else's profile.
    pub can_follow: bool,
    pub listing: ListingView,
}

impl ProfileView {
    pub fn new(listing: ProfileListing, signed_in: bool) -> Self {
        let ProfileListing {
            author,
            post_count,
            following,
            is_self,
            page,
        } = listing;
        Self {
            display_name: author.display_name(),
            username: author.username,
            post_count,
            following,
            can_follow: signed_in && !is_self,
            listing: ListingView::from_page(page),
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedView>,
}

pub struct CommentView {
    pub author_username: String,
    pub author_name: String,
    pub text: String,
    pub created: String,
}

impl From<CommentEntry> for CommentView {
    fn from(entry: CommentEntry) -> Self {
        Self {
            author_username: entry.author.username,
            author_name: entry.author.display_name,
            text: entry.comment.text,
            created: format_date(entry.comment.created),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

impl PostDetailView {
    pub fn new(detail: PostDetail, viewer_id: Option<i64>) -> Self {
        let PostDetail {
            entry,
            author_post_count,
            comments,
        } = detail;
        let can_edit = viewer_id == Some(entry.author.id);
        Self {
            post: PostCard::from(entry),
            author_post_count,
            comments: comments.into_iter().map(CommentView::from).collect(),
            can_edit,
            can_comment: viewer_id.is_some(),
        }
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOption {
    pub id: i64,
    pub label: String,
    pub selected: bool,
}

/// One rendered form field with its submitted value and errors.
pub struct FormFieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    pub value: String,
    pub errors: Vec<String>,
}

impl FormFieldView {
    fn post_field(name: &'static str, value: String, errors: &FieldErrors) -> Self {
        let (label, help_text) = POST_SCHEMA
            .field(name)
            .map(|spec| (spec.label, spec.help_text))
            .unwrap_or((name, ""));
        Self {
            name,
            label,
            help_text,
            value,
            errors: errors.for_field(name).to_vec(),
        }
    }
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: FormFieldView,
    pub group: FormFieldView,
    pub image: FormFieldView,
    pub groups: Vec<GroupOption>,
}

/// Raw values shown back in the post form.
#[derive(Debug, Default, Clone)]
pub struct PostFormValues {
    pub text: String,
    pub group: String,
    pub image: String,
}

impl PostFormValues {
    pub fn from_entry(entry: &PostEntry) -> Self {
        Self {
            text: entry.post.text.clone(),
            group: entry
                .post
                .group_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            image: entry.post.image.clone().unwrap_or_default(),
        }
    }
}

impl PostFormView {
    /// `edit_id` is set when editing an existing post.
    pub fn new(
        edit_id: Option<i64>,
        values: PostFormValues,
        errors: &FieldErrors,
        groups: &[GroupRecord],
    ) -> Self {
        let selected = values.group.trim().parse::<i64>().ok();
        let groups = groups
            .iter()
            .map(|group| GroupOption {
                id: group.id,
                label: group.to_string(),
                selected: selected == Some(group.id),
            })
            .collect();

        let action = match edit_id {
            Some(id) => format!("/posts/{id}/edit"),
            None => "/create".to_string(),
        };

        Self {
            is_edit: edit_id.is_some(),
            action,
            text: FormFieldView::post_field("text", values.text, errors),
            group: FormFieldView::post_field("group", values.group, errors),
            image: FormFieldView::post_field("image", values.image, errors),
            groups,
        }
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn new(status: StatusCode, message: &str) -> Self {
        let title = status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string();
        Self {
            status: status.as_u16(),
            title,
            message: message.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

fn format_date(value: OffsetDateTime) -> String {
    value.format(DATE_FORMAT).unwrap_or_default()
}

fn iso_date(value: OffsetDateTime) -> String {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
