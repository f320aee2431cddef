//! Page cache middleware.
//!
//! Serves stored responses for `GET` requests and stores fresh `200 OK`
//! responses that carry no `Set-Cookie` header.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{CachedResponse, PageCache, PageKey};

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<Arc<PageCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.is_enabled() || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageKey::from_uri(request.uri());

    if let Some(cached) = cache.get(&key) {
        debug!(target = "yatube::cache", outcome = "hit", key = %key, "serving cached page");
        return cached.into_response();
    }

    debug!(target = "yatube::cache", outcome = "miss", key = %key, "rendering page");
    let response = next.run(request).await;

    if !should_store_response(&response) {
        return response;
    }

    match buffer_response(response).await {
        Ok((rebuilt, cached)) => {
            cache.put(key, cached);
            rebuilt
        }
        Err((rebuilt, error)) => {
            warn!(target = "yatube::cache", key = %key, error = %error, "page not cached");
            rebuilt
        }
    }
}

pub fn should_store_response(response: &Response) -> bool {
    if response.status() != StatusCode::OK {
        return false;
    }

    !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}
