use thiserror::Error;

use crate::core::config::ConfigError;
use crate::documents::ExtractionError;
use crate::rag::StoreError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open vector store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to initialize document parser: {0}")]
    Parser(#[from] ExtractionError),
}
