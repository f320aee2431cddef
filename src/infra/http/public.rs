use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use url::form_urlencoded::byte_serialize;

use crate::{
    application::{
        error::HttpError,
        feed::{FeedService, parse_post_id},
        follows::FollowService,
        pagination::PageRequest,
        posts::{CommentOutcome, PostError, PostService},
        repos::HealthRepo,
    },
    cache::{PageCache, page_cache_layer},
    domain::forms::FieldErrors,
    presentation::views::{
        FeedView, FollowTemplate, GroupTemplate, GroupView, IndexTemplate, LayoutContext,
        PostDetailTemplate, PostDetailView, PostFormValues, ProfileTemplate, ProfileView,
        render_not_found_response, render_template_response,
    },
};

use super::{
    auth::{Authenticator, MaybeViewer, RequireViewer},
    db_health_response,
    forms::{FormInput, post_form_response, submitted_values},
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub health: Arc<dyn HealthRepo>,
    pub auth: Arc<dyn Authenticator>,
    pub cache: Arc<PageCache>,
    pub login_path: Arc<str>,
    pub page_size: u32,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the home index is cached; it renders no viewer-specific content.
    let cached_routes = Router::new()
        .route("/", get(index))
        .route_layer(middleware::from_fn_with_state(
            state.cache.clone(),
            page_cache_layer,
        ));

    let routes = Router::new()
        .route("/group/{slug}", get(group_listing))
        .route("/profile/{username}", get(profile))
        .route("/profile/{username}/follow", get(profile_follow))
        .route("/profile/{username}/unfollow", get(profile_unfollow))
        .route("/posts/{id}", get(post_detail))
        .route("/posts/{id}/edit", get(edit_form).post(edit_post))
        .route("/posts/{id}/comment", post(add_comment))
        .route("/create", get(create_form).post(create_post))
        .route("/follow", get(follow_index))
        .route("/_health/db", get(public_health));

    cached_routes
        .merge(routes)
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn request(&self, per_page: u32) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), per_page)
    }
}

fn viewer_name(viewer: &MaybeViewer) -> Option<String> {
    viewer.0.as_ref().map(|viewer| viewer.username.clone())
}

async fn index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let page = state.feed.index(query.request(state.page_size)).await?;
    let content = FeedView::new("Latest posts", page);
    let view = LayoutContext::new("Latest posts", None, content);
    Ok(render_template_response(IndexTemplate { view }, StatusCode::OK))
}

async fn group_listing(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    viewer: MaybeViewer,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let listing = state
        .feed
        .group_listing(&slug, query.request(state.page_size))
        .await?;
    let content = GroupView::from(listing);
    let view = LayoutContext::new(content.title.clone(), viewer_name(&viewer), content);
    Ok(render_template_response(GroupTemplate { view }, StatusCode::OK))
}

async fn profile(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    viewer: MaybeViewer,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let viewer_id = viewer.0.as_ref().map(|viewer| viewer.id);
    let listing = state
        .feed
        .profile_listing(&username, viewer_id, query.request(state.page_size))
        .await?;
    let content = ProfileView::new(listing, viewer_id.is_some());
    let title = format!("Profile of {}", content.display_name);
    let view = LayoutContext::new(title, viewer_name(&viewer), content);
    Ok(render_template_response(ProfileTemplate { view }, StatusCode::OK))
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    viewer: MaybeViewer,
) -> Result<Response, HttpError> {
    let detail = state.feed.post_detail(&raw_id).await?;
    let title = detail.entry.post.to_string();
    let content = PostDetailView::new(detail, viewer.0.as_ref().map(|viewer| viewer.id));
    let view = LayoutContext::new(title, viewer_name(&viewer), content);
    Ok(render_template_response(
        PostDetailTemplate { view },
        StatusCode::OK,
    ))
}

async fn create_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
) -> Result<Response, HttpError> {
    let groups = state.posts.group_choices().await?;
    Ok(post_form_response(
        &viewer.username,
        None,
        PostFormValues::default(),
        &FieldErrors::new(),
        &groups,
    ))
}

async fn create_post(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Form(input): FormInput,
) -> Result<Response, HttpError> {
    match state.posts.create_post(viewer.id, &input).await {
        Ok(_) => Ok(redirect_to_profile(&viewer.username)),
        Err(PostError::Invalid(errors)) => {
            let groups = state.posts.group_choices().await?;
            Ok(post_form_response(
                &viewer.username,
                None,
                submitted_values(&input),
                &errors,
                &groups,
            ))
        }
        Err(err) => Err(err.into()),
    }
}

async fn edit_form(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    RequireViewer(viewer): RequireViewer,
) -> Result<Response, HttpError> {
    match state.posts.edit_form(viewer.id, &raw_id).await {
        Ok(entry) => {
            let groups = state.posts.group_choices().await?;
            Ok(post_form_response(
                &viewer.username,
                Some(entry.post.id),
                PostFormValues::from_entry(&entry),
                &FieldErrors::new(),
                &groups,
            ))
        }
        Err(PostError::Forbidden { post_id, .. }) => Ok(redirect_to_post(post_id)),
        Err(err) => Err(err.into()),
    }
}

async fn edit_post(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    RequireViewer(viewer): RequireViewer,
    Form(input): FormInput,
) -> Result<Response, HttpError> {
    match state.posts.update_post(viewer.id, &raw_id, &input).await {
        Ok(post) => Ok(redirect_to_post(post.id)),
        Err(PostError::Forbidden { post_id, .. }) => Ok(redirect_to_post(post_id)),
        Err(PostError::Invalid(errors)) => {
            let groups = state.posts.group_choices().await?;
            Ok(post_form_response(
                &viewer.username,
                parse_post_id(&raw_id),
                submitted_values(&input),
                &errors,
                &groups,
            ))
        }
        Err(err) => Err(err.into()),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    Path(raw_id): Path<String>,
    RequireViewer(viewer): RequireViewer,
    Form(input): FormInput,
) -> Result<Response, HttpError> {
    let post_id = match state.posts.add_comment(viewer.id, &raw_id, &input).await? {
        CommentOutcome::Added(comment) => comment.post_id,
        CommentOutcome::Rejected { post_id, .. } => post_id,
    };
    Ok(redirect_to_post(post_id))
}

async fn follow_index(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let page = state
        .feed
        .follow_feed(viewer.id, query.request(state.page_size))
        .await?;
    let content = FeedView::new("Posts by authors you follow", page);
    let view = LayoutContext::new("Following", Some(viewer.username), content);
    Ok(render_template_response(FollowTemplate { view }, StatusCode::OK))
}

async fn profile_follow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    RequireViewer(viewer): RequireViewer,
) -> Result<Response, HttpError> {
    state.follows.follow(viewer.id, &username).await?;
    Ok(redirect_to_profile(&username))
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    RequireViewer(viewer): RequireViewer,
) -> Result<Response, HttpError> {
    state.follows.unfollow(viewer.id, &username).await?;
    Ok(redirect_to_profile(&username))
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback() -> Response {
    render_not_found_response()
}

fn redirect_to_post(post_id: i64) -> Response {
    Redirect::to(&format!("/posts/{post_id}")).into_response()
}

fn redirect_to_profile(username: &str) -> Response {
    Redirect::to(&profile_path(username)).into_response()
}

/// `/profile/{username}` with the username percent-encoded as one path segment.
fn profile_path(username: &str) -> String {
    let segment: String = byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}", segment.replace('+', "%20"))
}
