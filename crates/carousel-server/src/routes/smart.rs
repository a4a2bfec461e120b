//! Prompt-matched images by partial tag overlap.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::error;

use super::{error_response, rejection_response};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/get-images-smart", post(post_smart_images))
}

#[derive(Debug, Default, Deserialize)]
pub struct SmartImagesRequest {
    /// One image per prompt, in order.
    #[serde(default)]
    pub prompts: Vec<String>,
    /// Folder to match in; defaults to the fallback folder.
    #[serde(default)]
    pub folder: Option<String>,
}

/// POST /api/get-images-smart — one image per prompt, best tag overlap first.
async fn post_smart_images(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SmartImagesRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    if request.prompts.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompts must not be empty");
    }

    let folder = request
        .folder
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| state.config.selection.fallback_folder.clone());
    if folder.contains("..") {
        return error_response(StatusCode::BAD_REQUEST, "Invalid folder");
    }

    match state.selector.select_smart(&request.prompts, &folder).await {
        Ok(images) => Json(serde_json::json!({ "images": images })).into_response(),
        Err(e) => {
            error!("Smart image selection failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::state::test_support::local_state;
    use axum::body::Body;
    use axum::http::Request;
    use carousel_store::TaggedItem;
    use tower::ServiceExt;

    async fn post_json(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/get-images-smart")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn lifestyle_state() -> (Arc<AppState>, tempfile::TempDir) {
        local_state(
            &["upskin_products/tub.jpg", "upskin_products/plant.jpg"],
            &[TaggedItem::new("upskin_products", "tub.jpg", &["shower", "bathroom"])],
        )
    }

    #[tokio::test]
    async fn test_prompts_matched_then_random() {
        let (state, _dir) = lifestyle_state();
        let (status, body) = post_json(
            build_router(state),
            r#"{"prompts": ["Shower thoughts", "Shower thoughts again"]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let images = body["images"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0]["imagePath"], "upskin_products/tub.jpg");
        assert_eq!(images[0]["matchScore"], 1);
        assert_eq!(images[0]["keywords"], serde_json::json!(["shower"]));
        assert_eq!(images[1]["imagePath"], "upskin_products/plant.jpg");
        assert_eq!(images[1]["matchScore"], 0);
        assert!(images[1]["url"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:3000/files/upskin_products/plant.jpg?expires="));
    }

    #[tokio::test]
    async fn test_rejects_bad_requests() {
        let (state, _dir) = lifestyle_state();
        let app = build_router(state);

        let (status, body) = post_json(app.clone(), r#"{"prompts": []}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "prompts must not be empty");

        let (status, _) = post_json(app.clone(), r#"{"prompts": ["x"], "folder": "../etc"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(app, r#"{"prompts": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_empty_folder_is_500() {
        let (state, _dir) = lifestyle_state();
        let (status, body) = post_json(
            build_router(state),
            r#"{"prompts": ["anything"], "folder": "nothing_here"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("No products available"));
    }
}
