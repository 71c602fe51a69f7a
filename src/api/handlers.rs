//! HTTP request handlers.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use crate::api::types::*;
use crate::domain::{GenerateRequest, Generation, StreamEvent};
use crate::error::{GatewayError, GatewayResult, INTERNAL_ERROR_MESSAGE};
use crate::provider::ProviderInfo;
use crate::AppState;

/// Service health and provider credential status.
///
/// GET /v1/health
#[utoipa::path(
    get,
    path = "/v1/health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let configured = state.orchestrator.registry().configured();
    let status = if configured.is_empty() { "degraded" } else { "ok" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks: HealthChecks {
            providers: status.to_string(),
        },
        providers_configured: configured,
    })
}

/// List registered providers and their models.
///
/// GET /v1/providers
#[utoipa::path(
    get,
    path = "/v1/providers",
    responses(
        (status = 200, description = "Providers sorted by name", body = [ProviderInfo])
    ),
    tag = "providers"
)]
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    Json(state.orchestrator.registry().list())
}

/// Generate a complete response through the safety pipeline.
///
/// POST /v1/generate
#[utoipa::path(
    post,
    path = "/v1/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generation complete", body = Generation),
        (status = 400, description = "Unknown provider", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid service token", body = crate::error::ErrorResponse),
        (status = 422, description = "Rejected by the safety pipeline or invalid request", body = crate::error::SafetyRejection),
        (status = 502, description = "Provider failure", body = crate::error::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "generation"
)]
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> GatewayResult<Json<Generation>> {
    let Json(request) = payload?;
    request.validate().map_err(GatewayError::Validation)?;

    tracing::info!(
        provider = %request.provider,
        model = %request.model,
        task_type = request.task_type.as_deref(),
        "Generation requested"
    );

    let generation = state.orchestrator.generate(&request).await?;
    Ok(Json(generation))
}

/// Stream a generation as server-sent events.
///
/// POST /v1/generate_stream
///
/// Each event's data is a JSON chunk `{content, done}`; the last is either
/// `{content, done: true, usage, finish_reason}` or `{error}`.
#[utoipa::path(
    post,
    path = "/v1/generate_stream",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Event stream of generation chunks"),
        (status = 400, description = "Unknown provider", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid service token", body = crate::error::ErrorResponse),
        (status = 422, description = "Prompt rejected by the safety pipeline or invalid request", body = crate::error::SafetyRejection)
    ),
    security(("bearer_auth" = [])),
    tag = "generation"
)]
pub async fn generate_stream(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> GatewayResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let Json(request) = payload?;
    request.validate().map_err(GatewayError::Validation)?;

    tracing::info!(
        provider = %request.provider,
        model = %request.model,
        task_type = request.task_type.as_deref(),
        "Streaming generation requested"
    );

    let events = state.orchestrator.generate_stream(&request)?;
    let stream = ReceiverStream::new(events).map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode stream event");
        Event::default().data(serde_json::json!({ "error": INTERNAL_ERROR_MESSAGE }).to_string())
    })
}
