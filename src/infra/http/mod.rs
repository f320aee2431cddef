//! HTTP surface: the public site router and the operator-only admin router.

mod admin;
mod auth;
mod forms;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use auth::{
    Authenticator, MaybeViewer, RequireViewer, TrustedHeaderAuthenticator, Viewer,
    login_redirect_location,
};
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::{
    error::{ErrorReport, HttpError},
    repos::RepoError,
};

/// `204` when the database answers, `503` with the failure attached otherwise.
fn db_health_response(result: Result<(), RepoError>) -> Response {
    let Err(err) = result else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let status = StatusCode::SERVICE_UNAVAILABLE;
    let mut response = status.into_response();
    ErrorReport::from_error("infra::http::db_health", status, &err).attach(&mut response);
    response
}

/// Repository failures that escape the application services, such as viewer
/// lookups during authentication.
fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    let (status, public_message) = match &err {
        RepoError::NotFound => return HttpError::not_found(source, err.to_string()),
        RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
        RepoError::Duplicate { .. } | RepoError::Integrity { .. } => {
            (StatusCode::CONFLICT, "Conflicting record")
        }
        RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
        RepoError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    };
    HttpError::from_error(source, status, public_message, &err)
}
