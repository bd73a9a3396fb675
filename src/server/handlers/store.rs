use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn clear_store(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.store.clear().await?;
    Ok(Json(json!({ "cleared": true })))
}
