//! REST API Server for the sales insight orchestrator
//!
//! Exposes the orchestrator via HTTP endpoints
//! Integrates with the analytics chat frontend

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agent::{Answer, Orchestrator};
use crate::config::AppConfig;
use crate::error::OrchestrationError;
use crate::models::FailureEnvelope;
use crate::Result;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RagRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub request_timeout: Duration,
}

fn failure(status: StatusCode, summary: &str, error: &str) -> Response {
    (
        status,
        Json(FailureEnvelope {
            summary: summary.to_string(),
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn failure_message(err: &OrchestrationError) -> &'static str {
    match err {
        OrchestrationError::TimeoutError(_) => "The analytics query timed out. Please try again.",
        OrchestrationError::ExecutionError(_) | OrchestrationError::DatabaseError(_) => {
            "The analytics query failed to run."
        }
        _ => "Could not turn this question into an analytics query.",
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Question Endpoint
/// =============================

async fn rag_handler(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<RagRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();

    let question = match payload {
        Ok(Json(RagRequest { query: Some(query) })) if !query.trim().is_empty() => query,
        Ok(_) => {
            return failure(StatusCode::BAD_REQUEST, "Please provide a question.", "bad_request");
        }
        Err(rejection) => {
            warn!(%request_id, "Rejected request body: {}", rejection);
            return failure(StatusCode::BAD_REQUEST, "Request body must be JSON with a query.", "bad_request");
        }
    };

    let span = info_span!("rag", %request_id);
    async move {
        info!(question = %question, "Received question");

        let outcome = tokio::time::timeout(
            state.request_timeout,
            state.orchestrator.answer(&question),
        )
        .await;

        match outcome {
            Ok(Ok(outcome)) => match outcome.answer {
                Answer::Rejected(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
                Answer::Answered(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
            },
            Ok(Err(e)) => failure(e.status_code(), failure_message(&e), e.kind()),
            Err(_) => {
                warn!(timeout_secs = state.request_timeout.as_secs(), "Request deadline exceeded");
                failure(
                    StatusCode::GATEWAY_TIMEOUT,
                    "The request took too long to answer.",
                    "timeout",
                )
            }
        }
    }
    .instrument(span)
    .await
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>, config: &AppConfig) -> Result<Router> {
    let origin = config
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| OrchestrationError::ConfigError(format!("CORS_ALLOWED_ORIGIN: {}", e)))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS, Method::GET])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE]);

    let state = ApiState {
        orchestrator,
        request_timeout: config.request_timeout,
    };

    Ok(Router::new()
        .route("/health", get(health))
        .route("/rag", post(rag_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(orchestrator: Arc<Orchestrator>, config: &AppConfig) -> Result<()> {
    let router = create_router(orchestrator, config)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", config.port);
    info!("Local: http://127.0.0.1:{}", config.port);

    axum::serve(listener, router).await?;

    Ok(())
}
