use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let generator_healthy = state.generator.health_check().await;
    Json(json!({
        "entries": state.store.count(),
        "dimension": state.store.dimension(),
        "generator": state.generator.name(),
        "generator_healthy": generator_healthy,
    }))
}
