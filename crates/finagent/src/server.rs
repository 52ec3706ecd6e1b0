//! HTTP transport over the request bridge.
//!
//! `GET /health` reports liveness and worker availability.
//! `POST /v1/query` runs one query and returns the normalized report.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use finagent_models::{Currency, NormalizedReport, Query};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bridge::RequestBridge;
use crate::error::{BridgeError, PipelineError};

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<RequestBridge>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub symbol: Option<String>,
    pub currency: Option<String>,
    /// Web search only, no price lookup.
    #[serde(default)]
    pub news: bool,
}

impl QueryRequest {
    fn into_query(self) -> Result<Query, ApiError> {
        if self.query.trim().is_empty() {
            return Err(ApiError::bad_request("query must not be empty"));
        }

        let mut query = if self.news {
            Query::news(self.query)
        } else {
            Query::new(self.query)
        };
        if let Some(symbol) = self.symbol.filter(|s| !s.trim().is_empty()) {
            query = query.with_symbol(symbol);
        }
        if let Some(code) = self.currency {
            let currency: Currency = code.parse().map_err(ApiError::bad_request)?;
            query = query.with_currency(currency);
        }
        Ok(query)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        let status = match &err {
            BridgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            BridgeError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::Pipeline(PipelineError::Orchestration(_)) => StatusCode::BAD_GATEWAY,
            BridgeError::Pipeline(PipelineError::Config(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn router(bridge: Arc<RequestBridge>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/query", post(run_query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { bridge })
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    bridge: Arc<RequestBridge>,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, router(bridge))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "workers": state.bridge.max_workers(),
        "idle_workers": state.bridge.idle_workers(),
    }))
}

async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<NormalizedReport>, ApiError> {
    let query = request.into_query()?;
    let query_id = query.id;

    match state.bridge.submit(query).await {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            warn!(%query_id, error = %err, "Query failed");
            Err(err.into())
        }
    }
}
