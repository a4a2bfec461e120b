//! Catalog tag listing.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use carousel_select::Vocabulary;
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tags", get(list_tags))
}

#[derive(Debug, Deserialize)]
pub struct TagsQuery {
    pub folder: Option<String>,
}

/// GET /api/tags — tags present in the catalog with their dimension.
async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TagsQuery>,
) -> Response {
    let folder = query.folder.as_deref().filter(|f| !f.is_empty());
    match state.catalog.available_tags(folder).await {
        Ok(tags) => {
            let entries: Vec<serde_json::Value> = tags
                .iter()
                .map(|tag| {
                    serde_json::json!({
                        "tag": tag,
                        "dimension": Vocabulary::dimension_of(tag),
                    })
                })
                .collect();
            Json(serde_json::json!({
                "tags": entries,
                "total": entries.len(),
            }))
            .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
