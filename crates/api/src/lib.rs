//! HTTP query surface.
//!
//! Read-only endpoints over the inscription store plus the bridge's claim
//! and collection queries. Everything returns JSON except `/content/{id}`,
//! which serves the raw inscription bytes. Internal failures never leak
//! their error text to clients.

pub mod bridge;
pub mod inscriptions;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ordbridge_bridge::{BridgeError, BridgeService};
use ordbridge_db::{DbError, InscriptionStore};
use tokio::{net::TcpListener, sync::watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Shared state for all handlers.
pub struct ApiState {
    pub inscriptions: InscriptionStore,
    /// Absent when the bridge subsystem is disabled; bridge endpoints then
    /// answer 404.
    pub bridge: Option<Arc<BridgeService>>,
}

impl ApiState {
    pub fn new(inscriptions: InscriptionStore, bridge: Option<Arc<BridgeService>>) -> Self {
        Self {
            inscriptions,
            bridge,
        }
    }

    pub(crate) fn bridge(&self) -> Result<&BridgeService, ApiError> {
        self.bridge
            .as_deref()
            .ok_or_else(|| ApiError::NotFound("bridge is not enabled".to_string()))
    }
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        error!(%err, "store error while serving request");
        ApiError::Internal
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        error!(%err, "bridge error while serving request");
        ApiError::Internal
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/inscription/{id}", get(inscriptions::get_inscription))
        .route("/content/{id}", get(inscriptions::get_content))
        .route(
            "/inscriptions/owner/{addr}",
            get(inscriptions::list_by_owner),
        )
        .route("/inscriptions/latest", get(inscriptions::list_latest))
        .route(
            "/inscriptions/type/{mime}",
            get(inscriptions::list_by_content_type),
        )
        .route("/stats", get(inscriptions::stats))
        .route("/bridge/stats", get(bridge::stats))
        .route("/bridge/claim/{id}", get(bridge::get_claim))
        .route("/bridge/claims/sender/{addr}", get(bridge::claims_by_sender))
        .route("/bridge/collection", get(bridge::collection_info))
        .route("/bridge/collection/check/{id}", get(bridge::collection_check))
        .route(
            "/bridge/collection/token/{token_id}",
            get(bridge::collection_token),
        )
        .route("/bridge/retry-failed", post(bridge::retry_failed))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until the shutdown signal flips.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;
    Ok(())
}
