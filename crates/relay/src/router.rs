use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_stream::{relay, ChatRequest, Upstream};
use futures::stream::TryStreamExt;

use crate::cors::build_cors_layer;
use crate::error::ApiError;

/// Shared by every request; the relay itself keeps no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/query_llm_stream", post(query_llm_stream))
        .route("/models", get(list_models))
        .route("/health", get(health_check))
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}

/// Streams the model output as `text/plain`, one write per upstream fragment.
async fn query_llm_stream(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))?;

    let fragments = relay::open(state.upstream.as_ref(), &request).await?;

    // An error item aborts the chunked body, which closes the connection
    // without a terminating chunk.
    let body = Body::from_stream(
        fragments
            .inspect_err(|e| log::warn!("closing response early: {e}"))
            .map_ok(Bytes::from),
    );

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.upstream.list_models().await?))
}

async fn health_check() -> &'static str {
    "OK"
}
