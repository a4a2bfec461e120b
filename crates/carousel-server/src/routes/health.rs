//! Health and backend status.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::warn;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /api/health — backends in use and catalog size.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let catalog_items = match state.catalog.count_items().await {
        Ok(count) => count,
        Err(e) => {
            warn!("Catalog count failed: {}", e);
            None
        }
    };

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage.backend_name(),
        "catalog": state.catalog.backend_name(),
        "catalogItems": catalog_items,
        "fallbackFolder": state.config.selection.fallback_folder,
        "textGeneration": state.llm_config.to_response(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::state::test_support::local_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use carousel_store::TaggedItem;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_backends() {
        let (state, _dir) = local_state(&[], &[TaggedItem::new("p", "a.jpg", &["serum"])]);
        let response = build_router(state)
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["storage"], "local");
        assert_eq!(body["catalog"], "sqlite");
        assert_eq!(body["catalogItems"], 1);
        assert!(body["textGeneration"]["activeProvider"].is_null());
    }
}
