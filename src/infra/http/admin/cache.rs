use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::AdminState;

pub(super) async fn clear_cache(State(state): State<AdminState>) -> Response {
    let cleared = state.cache.clear();
    info!(target = "yatube::admin", cleared, "page cache cleared");
    StatusCode::NO_CONTENT.into_response()
}
