//! Viewer resolution.
//!
//! Authentication itself happens outside this service. A trusted reverse
//! proxy forwards the signed-in username in a header; [`Authenticator`]
//! turns request headers into an optional [`Viewer`].

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;
use url::form_urlencoded::byte_serialize;

use crate::application::error::HttpError;
use crate::application::repos::{RepoError, UsersRepo};

use super::{HttpState, repo_error_to_http};

/// The signed-in user making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: i64,
    pub username: String,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Viewer>, RepoError>;
}

/// Trusts a username header set by the reverse proxy in front of the service.
pub struct TrustedHeaderAuthenticator {
    header: HeaderName,
    users: Arc<dyn UsersRepo>,
}

impl TrustedHeaderAuthenticator {
    pub fn new(header: HeaderName, users: Arc<dyn UsersRepo>) -> Self {
        Self { header, users }
    }
}

#[async_trait]
impl Authenticator for TrustedHeaderAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Viewer>, RepoError> {
        let Some(username) = headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return Ok(None);
        };

        let user = self.users.find_by_username(username).await?;
        if user.is_none() {
            debug!(
                target = "yatube::http::auth",
                username, "forwarded username is not a known user"
            );
        }

        Ok(user.map(|user| Viewer {
            id: user.id,
            username: user.username,
        }))
    }
}

/// `{login_path}?next={path and query}`, with `/` left readable in `next`.
pub fn login_redirect_location(login_path: &str, uri: &Uri) -> String {
    let next = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    let encoded: String = byte_serialize(next.as_bytes()).collect();
    format!("{login_path}?next={}", encoded.replace("%2F", "/"))
}

async fn resolve_viewer(parts: &mut Parts, state: &HttpState) -> Result<Option<Viewer>, HttpError> {
    if let Some(viewer) = parts.extensions.get::<Option<Viewer>>() {
        return Ok(viewer.clone());
    }

    let viewer = state
        .auth
        .authenticate(&parts.headers)
        .await
        .map_err(|err| repo_error_to_http("infra::http::auth::resolve_viewer", err))?;
    parts.extensions.insert(viewer.clone());
    Ok(viewer)
}

/// The viewer, if any. Never rejects anonymous requests.
pub struct MaybeViewer(pub Option<Viewer>);

impl FromRequestParts<HttpState> for MaybeViewer {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        resolve_viewer(parts, state).await.map(MaybeViewer)
    }
}

/// A signed-in viewer; anonymous requests are redirected to the login page.
pub struct RequireViewer(pub Viewer);

impl FromRequestParts<HttpState> for RequireViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_viewer(parts, state).await {
            Ok(Some(viewer)) => Ok(RequireViewer(viewer)),
            Ok(None) => {
                let location = login_redirect_location(&state.login_path, &parts.uri);
                Err(Redirect::to(&location).into_response())
            }
            Err(err) => Err(err.into_response()),
        }
    }
}
