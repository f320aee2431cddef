use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{feed::FeedError, follows::FollowError, posts::PostError},
    domain::error::DomainError,
    infra::error::InfraError,
    presentation::views,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Handler-level error rendered as an HTML error page with an attached report.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn not_found(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, "Page not found", detail)
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = views::render_error_response(self.status, self.public_message);
        self.report.attach(&mut response);
        response
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::error::feed_error_to_http_error";
        match &error {
            FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) | FeedError::UnknownPost(_) => {
                HttpError::not_found(SOURCE, error.to_string())
            }
            FeedError::Repo(err) => HttpError::internal(SOURCE, err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::error::post_error_to_http_error";
        match &error {
            PostError::NotFound(_) => HttpError::not_found(SOURCE, error.to_string()),
            PostError::Invalid(_) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                error.to_string(),
            ),
            PostError::Forbidden { .. } => HttpError::new(
                SOURCE,
                StatusCode::FORBIDDEN,
                "Forbidden",
                error.to_string(),
            ),
            PostError::Repo(err) => HttpError::internal(SOURCE, err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        const SOURCE: &str = "application::error::follow_error_to_http_error";
        match &error {
            FollowError::UnknownAuthor(_) => HttpError::not_found(SOURCE, error.to_string()),
            FollowError::Repo(err) => HttpError::internal(SOURCE, err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Infra(InfraError::Database { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Infra(
                InfraError::Configuration { .. }
                | InfraError::Migration(_)
                | InfraError::Telemetry(_)
                | InfraError::Io(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                "Page not found"
            }
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                "Request could not be processed"
            }
            AppError::Infra(InfraError::Database { .. }) => "Service temporarily unavailable",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Migration(_)) => "Database schema is out of date",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = views::render_error_response(status, message);
        report.attach(&mut response);
        response
    }
}
