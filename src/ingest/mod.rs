//! Getting documents into the vector store: single uploads over HTTP and
//! whole-directory re-indexing from the command line.

pub mod batch;
pub mod upload;

pub use batch::{BatchIngestor, FileReport, IngestReport};
pub use upload::{ingest_document, IngestStats, Upload};

use thiserror::Error;

use crate::documents::ExtractionError;
use crate::rag::{ChunkError, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),
    #[error("'{0}' is already indexed")]
    AlreadyIndexed(String),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("invalid chunking settings: {0}")]
    Chunking(#[from] ChunkError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
