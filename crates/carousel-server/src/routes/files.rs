//! Signed file serving for the local storage backend.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::debug;

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/files/{*path}", get(serve_file))
}

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: Option<i64>,
    pub token: Option<String>,
}

/// GET /files/{path}?expires=&token= — serve a file behind a signed URL.
async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Response {
    let Some(local) = state.local_files.as_ref() else {
        return error_response(StatusCode::NOT_FOUND, "File serving is not enabled");
    };

    let (Some(expires), Some(token)) = (query.expires, query.token.as_deref()) else {
        return error_response(StatusCode::FORBIDDEN, "Missing signature");
    };
    let now = chrono::Utc::now().timestamp();
    if !local.verify(&path, expires, token, now) {
        debug!("Rejected signature for {}", path);
        return error_response(StatusCode::FORBIDDEN, "Invalid or expired signature");
    }

    let Some(file) = local.resolve_path(&path) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid path");
    };
    match tokio::fs::read(&file).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "File not found"),
    }
}

fn content_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::state::test_support::local_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn status_of(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a/b.JPG"), "image/jpeg");
        assert_eq!(content_type("a/b.webp"), "image/webp");
        assert_eq!(content_type("a/b"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_serves_signed_file() {
        let (state, _dir) = local_state(&["p/a.png"], &[]);
        let local = state.local_files.clone().unwrap();
        let expires = chrono::Utc::now().timestamp() + 60;
        let url = local.signed_url_at("p/a.png", expires);
        let uri = url.trim_start_matches("http://localhost:3000");

        let response = build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_rejects_bad_or_expired_signature() {
        let (state, _dir) = local_state(&["p/a.png"], &[]);
        let local = state.local_files.clone().unwrap();
        let app = build_router(state);

        assert_eq!(status_of(app.clone(), "/files/p/a.png").await, StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(app.clone(), "/files/p/a.png?expires=9999999999&token=abc").await,
            StatusCode::FORBIDDEN
        );

        let past = chrono::Utc::now().timestamp() - 10;
        let expired = local.signed_url_at("p/a.png", past);
        assert_eq!(
            status_of(app, expired.trim_start_matches("http://localhost:3000")).await,
            StatusCode::FORBIDDEN
        );
    }
}
