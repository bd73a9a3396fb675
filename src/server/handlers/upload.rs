use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::ingest::{ingest_document, Upload};
use crate::state::AppState;

/// Multipart upload of either a `file` part or a `url` text field.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file = None;
    let mut url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                file = Some(Upload::File {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "url" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read url: {}", e)))?;
                if !text.trim().is_empty() {
                    url = Some(Upload::Url(text));
                }
            }
            _ => continue,
        }
    }

    // A URL wins when both are sent.
    let upload = url.or(file).ok_or_else(|| {
        ApiError::BadRequest("Please provide either a file or URL".to_string())
    })?;

    let stats = ingest_document(
        &state.store,
        &state.parser,
        &state.settings.chunking,
        upload,
    )
    .await
    .map_err(|err| {
        tracing::warn!("Upload rejected: {}", err);
        ApiError::from(err)
    })?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully processed {}", stats.source),
        "stats": stats,
    })))
}
