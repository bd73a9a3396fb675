use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::core::errors::ApiError;
use crate::rag::{RagError, RagEvent};
use crate::state::AppState;

const EVENT_BUFFER: usize = 16;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

pub async fn rag_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Response, ApiError> {
    let query = payload
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Query is required and must be a non-empty string".to_string())
        })?;

    if !payload.stream {
        let answer = state.orchestrator.answer(&query).await.map_err(|err| {
            tracing::error!("RAG query failed: {}", err);
            ApiError::from(err)
        })?;
        return Ok(Json(answer).into_response());
    }

    let (tx, rx) = mpsc::channel::<RagEvent>(EVENT_BUFFER);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        match orchestrator.answer_streaming(&query, tx).await {
            Ok(answer) => tracing::debug!("Streamed answer with {} sources", answer.sources.len()),
            Err(RagError::Cancelled) => tracing::info!("Client left before the answer finished"),
            Err(err) => tracing::error!("Streaming RAG query failed: {}", err),
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Ok::<Event, Infallible>(
            Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data(r#"{"error":"encoding failed","done":true}"#)),
        )
    });

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response())
}
