//! Retrieval-augmented generation over a local vector store.
//!
//! - `Chunker`: overlapping fixed-size windows over raw text
//! - `VectorStore`: durable brute-force cosine store
//! - `RagOrchestrator`: retrieval + prompt + generation, blocking or streamed

pub mod chunker;
pub mod orchestrator;
pub mod prompt;
mod snapshot;
pub mod store;
pub mod types;


pub use chunker::{chunk, ChunkError, Chunker, TextChunk};
pub use orchestrator::{
    OrchestratorConfig, RagAnswer, RagError, RagEvent, RagOrchestrator, FALLBACK_ANSWER,
};
pub use prompt::build_prompt;
pub use store::{StoreError, VectorStore};
pub use types::{ChunkMetadata, DocumentType, QueryResult, Source, VectorEntry};
