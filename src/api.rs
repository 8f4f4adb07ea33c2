//! REST API server for the meta supervisor
//!
//! Exposes both dispatch strategies over HTTP:
//! - `/api/process`: keyword extraction + dispatch table
//! - `/api/query`, `/api/agent`: conversational agent with tools

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::agent::AgentService;
use crate::envelope::{extract_answer, ResponseEnvelope};
use crate::middleware::{log_requests, LoggingConfig};
use crate::models::{AnswerResponse, Query};
use crate::supervisor::Supervisor;

pub const SERVICE_NAME: &str = "Meta Supervisor";

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub supervisor: Arc<Supervisor>,
    pub agent_service: Arc<AgentService>,
}

/// =============================
/// Health Endpoints
/// =============================

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Dispatch-Table Endpoint
/// =============================

async fn process_query(
    State(state): State<ApiState>,
    Json(query): Json<Query>,
) -> Json<ResponseEnvelope> {
    info!(query = %query.query, "Received process request");
    Json(state.supervisor.process(&query).await)
}

/// =============================
/// Agent Endpoints
/// =============================

/// Always answers 200; failures are reported inside the answer text
async fn query_agent(
    State(state): State<ApiState>,
    Json(query): Json<Query>,
) -> Json<AnswerResponse> {
    info!(query = %query.query, "Received agent query");

    let answer = match state.agent_service.query_with_agent(&query.query).await {
        Ok(result) => extract_answer(result.as_ref()),
        Err(e) => {
            error!(error = %e, "Agent query failed");
            format!("오류가 발생했습니다: {}", e)
        }
    };

    Json(AnswerResponse { answer })
}

async fn run_agent(
    State(state): State<ApiState>,
    Json(query): Json<Query>,
) -> Json<ResponseEnvelope> {
    info!(query = %query.query, "Received agent request");
    Json(ResponseEnvelope::from(
        state.agent_service.query_with_agent(&query.query).await,
    ))
}

/// =============================
/// Failure Boundary
/// =============================

/// Last-resort answer for a handler that panicked
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = panic.downcast_ref::<&str>() {
        text.to_string()
    } else {
        "request handler panicked".to_string()
    };

    error!(panic = %message, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ResponseEnvelope::failure(
            "INTERNAL_SERVER_ERROR",
            format!("Internal error: {}", message),
        )),
    )
        .into_response()
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    create_router_with_logging(state, LoggingConfig::default())
}

pub fn create_router_with_logging(state: ApiState, logging: LoggingConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/process", post(process_query))
        .route("/api/query", post(query_agent))
        .route("/api/agent", post(run_agent))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(Arc::new(logging), log_requests))
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    bind_address: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    info!("API Server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
