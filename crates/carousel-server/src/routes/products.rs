//! Product image selection routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use carousel_select::{CriteriaBundle, SearchCriteria};
use serde::Deserialize;
use tracing::{error, info};

use super::{error_response, rejection_response};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/get-product-images",
        get(get_product_images).post(post_product_images),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductImagesRequest {
    #[serde(default)]
    pub topic: Option<String>,
    /// Explicit per-slot criteria; skips extraction.
    #[serde(default)]
    pub structure: Option<Vec<SearchCriteria>>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ProductImagesQuery {
    pub topic: Option<String>,
    pub count: Option<usize>,
}

/// POST /api/get-product-images — select product images for a carousel.
async fn post_product_images(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProductImagesRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => run_selection(&state, request).await,
        Err(rejection) => rejection_response(rejection),
    }
}

/// GET /api/get-product-images — same pipeline, for manual testing.
async fn get_product_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductImagesQuery>,
) -> Response {
    let request = ProductImagesRequest {
        topic: query.topic,
        structure: None,
        count: query.count,
    };
    run_selection(&state, request).await
}

/// Build the bundle: an explicit structure wins, then the topic, then a
/// plain count. An explicit count overrides the extracted one.
async fn bundle_for(state: &AppState, request: ProductImagesRequest) -> CriteriaBundle {
    if let Some(structure) = request.structure.filter(|s| !s.is_empty()) {
        return CriteriaBundle::from_structure(structure);
    }

    let default_count = state.config.selection.default_count;
    match request.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => {
            info!("Topic: \"{}\"", topic);
            let mut bundle = state.selector.extractor().extract(topic).await;
            if let Some(count) = request.count {
                bundle.count = count;
            }
            bundle
        }
        None => CriteriaBundle::with_count(request.count.unwrap_or(default_count)),
    }
}

async fn run_selection(state: &AppState, request: ProductImagesRequest) -> Response {
    let bundle = bundle_for(state, request).await;

    match state.selector.select(&bundle).await {
        Ok(images) => Json(serde_json::json!({ "images": images })).into_response(),
        Err(e) => {
            error!("Product selection failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
