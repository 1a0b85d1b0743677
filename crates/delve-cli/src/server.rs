//! HTTP surface: the generate proxy plus the throttled image lookup.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use delve_core::{GenerateRequest, GenerateResponse};
use delve_net::{Explorer, generate};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    explorer: Explorer,
}

impl AppState {
    pub fn new(explorer: Explorer) -> Self {
        Self { explorer }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/image", get(image_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;
    tracing::info!("server stopped");
    Ok(())
}

// The body is parsed by hand: browsers post it as text/plain.
async fn generate_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let req: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": format!("invalid request body: {e}") })),
            )
                .into_response();
        }
    };

    match generate(state.explorer.model(), &req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            tracing::error!(query = req.query.as_str(), "error calling language model: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GenerateResponse::fallback()),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageParams {
    query: String,
}

async fn image_handler(
    State(state): State<AppState>,
    Query(params): Query<ImageParams>,
) -> Json<serde_json::Value> {
    let outcome = state.explorer.images().lookup(&params.query).await;
    Json(serde_json::json!({
        "query": params.query,
        "image_url": outcome.url(),
        "outcome": outcome.kind(),
        "stage": outcome.stage().map(|s| s.as_str()),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
