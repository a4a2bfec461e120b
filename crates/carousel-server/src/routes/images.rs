//! Random images from a storage folder (title pages and the like).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use carousel_core::Error;
use serde::Deserialize;
use tracing::error;

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/get-images", get(get_images))
}

#[derive(Debug, Deserialize)]
pub struct ImagesQuery {
    pub folder: Option<String>,
    pub count: Option<usize>,
}

/// GET /api/get-images — signed URLs for random images in a folder.
async fn get_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImagesQuery>,
) -> Response {
    let settings = &state.config.selection;
    let folder = query
        .folder
        .map(|f| f.trim().trim_matches('/').to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| settings.first_page_folder.clone());
    if folder.contains("..") {
        return error_response(StatusCode::BAD_REQUEST, "Invalid folder");
    }
    let count = query.count.unwrap_or(1).clamp(1, settings.max_count);

    match state.selector.random_images(&folder, count).await {
        Ok(images) => Json(serde_json::json!({ "images": images })).into_response(),
        Err(Error::NotFound(msg)) => error_response(StatusCode::NOT_FOUND, msg),
        Err(e) => {
            error!("Fetching images from {} failed: {}", folder, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
