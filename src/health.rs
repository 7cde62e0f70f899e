//! Liveness endpoints for the hosting platform

use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct StatusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    status: &'static str,
}

async fn index() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: Some("TRY to Satoshi Telegram Bot is running"),
        status: "ok",
    })
}

async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: None,
        status: "healthy",
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

/// Serve the health router until the task is dropped
pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Health server listening on {}", listener.local_addr()?);
    axum::serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_index() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "message": "TRY to Satoshi Telegram Bot is running", "status": "ok" })
        );
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
