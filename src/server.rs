//! Web server module.
//!
//! Serves the cached probe results over a small JSON API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::cache::ResultCache;
use crate::probe::ProbeResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: ResultCache,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// Probe results keyed by target identifier.
#[derive(Serialize)]
struct ResultsResponse {
    results: HashMap<String, ProbeResult>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/results", get(results_handler))
        .route("/healthz", get(healthz_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Latest cached probe results per target.
async fn results_handler(State(state): State<Arc<AppState>>) -> Json<ResultsResponse> {
    let results = state.cache.snapshot().await;
    Json(ResultsResponse { results })
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
