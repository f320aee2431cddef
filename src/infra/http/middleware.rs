use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request data shared between middleware layers.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Adopt the proxy's `x-request-id` when present, otherwise mint one, and echo
/// it back on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ctx = RequestContext { request_id };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    counter!("yatube_http_requests_total", "status" => status_class(status)).increment(1);
    histogram!("yatube_http_request_ms").record(elapsed_ms as f64);

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let path = uri.path();
    let query = uri.query().unwrap_or("");

    if status.is_server_error() {
        error!(
            target = "yatube::http::response",
            status = status.as_u16(),
            %method,
            path,
            query,
            elapsed_ms,
            source,
            chain = ?chain,
            request_id,
            "request failed",
        );
    } else if status == StatusCode::NOT_FOUND {
        warn!(
            target = "yatube::http::response",
            status = status.as_u16(),
            %method,
            path,
            request_id,
            "not found",
        );
    } else {
        warn!(
            target = "yatube::http::response",
            status = status.as_u16(),
            %method,
            path,
            query,
            source,
            chain = ?chain,
            request_id,
            "client request error",
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn router() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(set_request_context))
    }

    #[test]
    fn status_classes_group_by_hundreds() {
        assert_eq!(status_class(StatusCode::OK), "2xx");
        assert_eq!(status_class(StatusCode::SEE_OTHER), "3xx");
        assert_eq!(status_class(StatusCode::NOT_FOUND), "4xx");
        assert_eq!(status_class(StatusCode::SERVICE_UNAVAILABLE), "5xx");
    }

    #[tokio::test]
    async fn proxy_request_id_is_echoed() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn missing_request_id_is_generated() {
        let response = router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
