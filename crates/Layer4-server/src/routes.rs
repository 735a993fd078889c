//! HTTP surface

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parley_foundation::{
    api::{
        routes, ChatRequest, DefaultProvider, DispatchOutcome, PushRegistration,
        ScheduleReceipt, ScheduleRequest, TriggerRequest,
    },
    ProviderCapability,
};
use parley_provider::{encode_stream, sse, ChatTurn};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::error::AppError;
use crate::state::AppState;

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::CHAT_STREAM, post(chat_stream))
        .route(routes::PROVIDERS, get(list_providers))
        .route(routes::DEFAULT_PROVIDER, get(default_provider))
        .route(routes::PUSH_REGISTER, post(register_push))
        .route(routes::ASYNC_TRIGGER, post(async_trigger))
        .route(routes::ASYNC_SCHEDULE, post(async_schedule))
        .route(routes::HEALTH, get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Stream one chat turn as SSE
///
/// Validation and routing failures are plain JSON errors; once the stream
/// has started, failures travel as a terminal `error` event.
async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let provider = state.resolver.resolve(&request.contact)?;

    let history = if request.history.is_empty() {
        state.history.history(&request.thread_id).await
    } else {
        request.history
    };

    debug!(
        contact = %request.contact.id,
        thread = %request.thread_id,
        kind = %provider.kind(),
        history = history.len(),
        "Starting chat stream"
    );

    let mut turn =
        ChatTurn::new(request.contact, request.thread_id, request.message).with_history(history);
    turn.metadata = request.metadata;

    let body = Body::from_stream(encode_stream(provider.send_message_stream(&turn)));

    Ok((
        [
            (header::CONTENT_TYPE, sse::CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderCapability>> {
    Json(state.resolver.capabilities())
}

async fn default_provider(State(state): State<AppState>) -> Json<DefaultProvider> {
    Json(DefaultProvider {
        kind: state.resolver.default_kind(),
    })
}

async fn register_push(
    State(state): State<AppState>,
    payload: Result<Json<PushRegistration>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(registration) = payload?;
    registration.validate()?;

    info!(
        contact = %registration.contact_id,
        thread = %registration.thread_id,
        platform = %registration.platform,
        "Registering push token"
    );
    state.push_tokens.register(registration).await?;

    Ok(Json(json!({ "ok": true })))
}

async fn async_trigger(
    State(state): State<AppState>,
    payload: Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<Json<DispatchOutcome>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let outcome = state
        .dispatcher
        .trigger(&request.contact, &request.thread_id, request.text.as_deref())
        .await?;
    Ok(Json(outcome))
}

async fn async_schedule(
    State(state): State<AppState>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<ScheduleReceipt>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let receipt = state
        .dispatcher
        .schedule(
            &request.contact,
            &request.thread_id,
            request.delay_seconds,
            request.text.as_deref(),
        )
        .await?;
    Ok(Json(receipt))
}

async fn health_check() -> &'static str {
    "ok"
}
