//! Same-origin relay that forwards generation requests to the backend.
//!
//! The request body is passed through untouched and the backend's status
//! code and JSON body are mirrored back. Any failure to reach the backend or
//! to read its reply collapses into one fixed 500 envelope. Bodies the
//! extractor rejects, such as ones over the size limit, keep their status
//! and get the same `{success, detail}` shape.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::{Client, Url};
use serde::de::IgnoredAny;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::adapters::live::relay::GENERATE_PATH;
use crate::config::BackendTarget;
use crate::error::BlueprintError;

/// `detail` of the envelope returned when the backend cannot be used.
pub const CONNECT_FAILURE: &str = "Failed to connect to backend service";

/// `detail` of the envelope returned for bodies over the configured limit.
pub const BODY_TOO_LARGE: &str = "Request body too large";

/// Shared handler state.
#[derive(Clone)]
pub struct RelayState {
    client: Client,
    generate_url: Url,
}

impl RelayState {
    /// Build state for forwarding to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generate URL cannot be derived from the target.
    pub fn new(target: &BackendTarget) -> Result<Self, BlueprintError> {
        Ok(Self { client: Client::new(), generate_url: target.generate_url()? })
    }
}

/// Relay routes: `POST /api/generate` and `GET /health`.
pub fn router(state: RelayState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(GENERATE_PATH, post(generate))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `listen` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    listen: &str,
    target: BackendTarget,
    max_body_bytes: usize,
) -> Result<(), BlueprintError> {
    let state = RelayState::new(&target)?;
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| BlueprintError::Server(format!("cannot bind {listen}: {e}")))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        backend = %target.origin,
        mode = %target.mode,
        "relay listening"
    );

    axum::serve(listener, router(state, max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BlueprintError::Server(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("relay shutting down");
}

async fn generate(
    State(state): State<RelayState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    match forward(&state, body).await {
        Ok((status, body)) => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, url = %state.generate_url, "relay error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "detail": CONNECT_FAILURE })),
            )
                .into_response()
        }
    }
}

/// Body extraction failures keep their status but get the JSON envelope.
fn rejected(rejection: &BytesRejection) -> Response {
    let status = rejection.status();
    tracing::warn!(status = status.as_u16(), reason = %rejection.body_text(), "request rejected");
    let detail = if status == StatusCode::PAYLOAD_TOO_LARGE {
        BODY_TOO_LARGE.to_string()
    } else {
        rejection.body_text()
    };
    (status, Json(json!({ "success": false, "detail": detail }))).into_response()
}

async fn forward(state: &RelayState, body: Bytes) -> Result<(StatusCode, Bytes), BlueprintError> {
    serde_json::from_slice::<IgnoredAny>(&body)
        .map_err(|e| BlueprintError::InvalidArgument(format!("request body is not JSON: {e}")))?;

    let response = state
        .client
        .post(state.generate_url.clone())
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| BlueprintError::Server(e.to_string()))?;
    let reply = response.bytes().await?;
    serde_json::from_slice::<IgnoredAny>(&reply).map_err(|e| BlueprintError::Api {
        status: status.as_u16(),
        message: format!("backend reply is not JSON: {e}"),
    })?;

    tracing::debug!(status = status.as_u16(), bytes = reply.len(), "backend replied");
    Ok((status, reply))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "timestamp": chrono::Utc::now().timestamp() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    use crate::config::DeploymentMode;

    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn spawn_relay(backend_origin: &str) -> String {
        spawn_relay_with_limit(backend_origin, 1024 * 1024).await
    }

    async fn spawn_relay_with_limit(backend_origin: &str, max_body_bytes: usize) -> String {
        let target = BackendTarget {
            mode: DeploymentMode::Development,
            origin: Url::parse(backend_origin).unwrap(),
        };
        let state = RelayState::new(&target).unwrap();
        spawn(router(state, max_body_bytes)).await
    }

    async fn post_raw(relay: &str, body: &'static str) -> (u16, Value) {
        let response = Client::new()
            .post(format!("{relay}{GENERATE_PATH}"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn forwards_body_and_mirrors_success() {
        let backend = Router::new().route(
            GENERATE_PATH,
            post(|Json(body): Json<Value>| async move {
                let expected = json!({
                    "image": "data:image/png;base64,AAAA",
                    "description": "",
                    "viewAngle": "top",
                    "style": "cartoon",
                });
                if body == expected {
                    let reply =
                        json!({"success": true, "imageUrl": "/out/1.png", "processingTime": 12});
                    (StatusCode::OK, Json(reply))
                } else {
                    let reply = json!({"success": false, "detail": "mangled"});
                    (StatusCode::UNPROCESSABLE_ENTITY, Json(reply))
                }
            }),
        );
        let backend = spawn(backend).await;
        let relay = spawn_relay(&backend).await;

        let raw = concat!(
            r#"{"image":"data:image/png;base64,AAAA","#,
            r#""description":"","viewAngle":"top","style":"cartoon"}"#
        );
        let (status, body) = post_raw(&relay, raw).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"success": true, "imageUrl": "/out/1.png", "processingTime": 12}));
    }

    #[tokio::test]
    async fn mirrors_backend_error_status() {
        let backend = Router::new().route(
            GENERATE_PATH,
            post(|| async {
                (StatusCode::BAD_REQUEST, Json(json!({"success": false, "detail": "bad image"})))
            }),
        );
        let backend = spawn(backend).await;
        let relay = spawn_relay(&backend).await;

        let (status, body) = post_raw(&relay, r#"{"image":"x"}"#).await;
        assert_eq!(status, 400);
        assert_eq!(body, json!({"success": false, "detail": "bad image"}));
    }

    #[tokio::test]
    async fn unreachable_backend_yields_fixed_envelope() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let relay = spawn_relay(&format!("http://{addr}")).await;
        let (status, body) = post_raw(&relay, r#"{"image":"data:image/png;base64,AAAA"}"#).await;
        assert_eq!(status, 500);
        assert_eq!(body, json!({"success": false, "detail": CONNECT_FAILURE}));
    }

    #[tokio::test]
    async fn non_json_backend_reply_yields_fixed_envelope() {
        let backend = Router::new().route(GENERATE_PATH, post(|| async { "<html>502</html>" }));
        let backend = spawn(backend).await;
        let relay = spawn_relay(&backend).await;

        let (status, body) = post_raw(&relay, "{}").await;
        assert_eq!(status, 500);
        assert_eq!(body["detail"], CONNECT_FAILURE);
    }

    #[tokio::test]
    async fn non_json_request_yields_fixed_envelope() {
        let relay = spawn_relay("http://127.0.0.1:9").await;
        let (status, body) = post_raw(&relay, "not json").await;
        assert_eq!(status, 500);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn oversized_body_gets_json_envelope() {
        let relay = spawn_relay_with_limit("http://127.0.0.1:9", 1024).await;
        let image = "A".repeat(2048);
        let response = Client::new()
            .post(format!("{relay}{GENERATE_PATH}"))
            .json(&json!({ "image": image, "description": "" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 413);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "success": false, "detail": BODY_TOO_LARGE }));
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let relay = spawn_relay("http://127.0.0.1:9").await;
        let reply = Client::new().get(format!("{relay}/health")).send().await.unwrap();
        let body: Value = reply.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].as_i64().unwrap() > 0);
    }
}
