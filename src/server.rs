//! HTTP surface: one request body in, one [`OperationOutcome`] out.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::EngineConfig;
use crate::model::OperationOutcome;
use crate::pipeline::Pipeline;
use crate::processor::catalog::CATALOG;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// The script; older clients send it as `code`.
    #[serde(default, alias = "code")]
    pub command: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogItem {
    pub name: &'static str,
    pub arity: String,
    pub declaration: String,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api/execute", post(execute))
        .route("/compile", post(execute))
        .route("/api/catalog", get(catalog))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

pub async fn serve(config: EngineConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(Arc::new(Pipeline::new(config)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Binding {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, app).await.context("Serving HTTP")?;
    Ok(())
}

/// POST /api/execute, POST /compile
async fn execute(
    State(pipeline): State<Arc<Pipeline>>,
    Json(req): Json<ExecuteRequest>,
) -> impl IntoResponse {
    let outcome = match req.command.as_deref() {
        Some(script) if !script.trim().is_empty() => pipeline.process(script).await,
        _ => OperationOutcome::rejected("Command is required"),
    };

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(outcome))
}

/// GET /api/catalog
async fn catalog() -> Json<Vec<CatalogItem>> {
    Json(
        CATALOG
            .iter()
            .map(|entry| CatalogItem {
                name: entry.name,
                arity: entry.arity().to_string(),
                declaration: entry.declaration(),
            })
            .collect(),
    )
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}
