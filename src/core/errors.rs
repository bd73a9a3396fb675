use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::core::config::ConfigError;
use crate::ingest::IngestError;
use crate::rag::{RagError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Validation-class failure that carries the underlying cause.
    #[error("bad request: {message}: {details}")]
    BadRequestWithDetails { message: String, details: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::BadRequestWithDetails { message, details } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "details": details }),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Service unavailable" }),
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateId(_) => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => ApiError::BadRequest(msg),
            IngestError::AlreadyIndexed(source) => ApiError::Conflict(format!(
                "'{}' is already indexed; clear the store before uploading it again",
                source
            )),
            IngestError::Extraction(cause) => ApiError::BadRequestWithDetails {
                message: "Failed to extract text from the document".to_string(),
                details: cause.to_string(),
            },
            IngestError::Store(store_err) => store_err.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_map_to_bad_request() {
        let response = ApiError::from(IngestError::Validation("nope".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn duplicate_ids_map_to_conflict() {
        let response = ApiError::from(StoreError::DuplicateId("a".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn persistence_failures_map_to_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let response = ApiError::from(StoreError::Persistence(io)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
