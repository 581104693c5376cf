pub mod config;
pub mod error;
pub mod llm;

use axum::{
    body::Bytes,
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use relay_shared::HealthResponse;
use serde_json::Value;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

pub use config::{CompletionParams, RelayConfig};
pub use error::RelayError;
pub use llm::LlmService;

pub fn app(llm_service: Arc<LlmService>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // Chat bodies are forwarded whatever their size.
        .route("/api/chat", post({
            let llm = llm_service.clone();
            move |body| chat(body, llm)
        }).layer(DefaultBodyLimit::disable()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

async fn chat(body: Bytes, llm_service: Arc<LlmService>) -> Result<Json<Value>, RelayError> {
    let messages = extract_messages(&body)?;
    info!(
        "Chat request with {} message(s), model {}",
        messages.as_array().map_or(0, Vec::len),
        llm_service.model()
    );

    let completion = llm_service.complete(&messages).await?;
    Ok(Json(completion))
}

/// Takes the raw request body rather than `Json<_>` so that a missing
/// content type, broken JSON and a missing key all end up as the same 400.
fn extract_messages(body: &[u8]) -> Result<Value, RelayError> {
    let mut request = serde_json::from_slice::<Value>(body).map_err(|e| {
        debug!("Rejecting chat body: {}", e);
        RelayError::InvalidRequest
    })?;

    request
        .as_object_mut()
        .and_then(|fields| fields.remove("messages"))
        .ok_or(RelayError::InvalidRequest)
}
