//! Durable in-process vector store.
//!
//! The live collection is an immutable `Arc<Vec<VectorEntry>>`. Mutations
//! build the next collection, persist it, and only then swap it in, so a
//! failed write leaves memory matching the last snapshot on disk. Writers
//! are serialized by an async gate; readers never wait on disk I/O.
//!
//! The persist-and-swap step runs in its own task holding the gate, so a
//! caller that gives up mid-write cannot split disk from memory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::snapshot;
use super::types::{ChunkMetadata, QueryResult, VectorEntry};
use crate::llm::{Embedder, LlmError};
use crate::vector_math::{rank_descending_by_cosine, VectorMathError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist vector snapshot: {0}")]
    Persistence(#[from] std::io::Error),
    #[error("vector snapshot is corrupt: {0}")]
    CorruptSnapshot(String),
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),
    #[error("an entry with id '{0}' already exists")]
    DuplicateId(String),
    #[error("embedding has {actual} dimensions, store holds {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("similarity scoring failed: {0}")]
    Scoring(#[from] VectorMathError),
}

pub struct VectorStore {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    entries: Arc<RwLock<Arc<Vec<VectorEntry>>>>,
    write_gate: Arc<Mutex<()>>,
}

impl VectorStore {
    /// Loads the snapshot at `path`, or starts empty when there is none.
    pub async fn open(path: PathBuf, embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        let load_path = path.clone();
        let entries = tokio::task::spawn_blocking(move || snapshot::load(&load_path))
            .await
            .map_err(join_error)??;

        tracing::info!(
            "Vector store opened with {} entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path,
            embedder,
            entries: Arc::new(RwLock::new(Arc::new(entries))),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Arc<Vec<VectorEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Writes `next` and swaps it in on a detached task that owns `gate`.
    /// Dropping the returned future does not stop the commit; the gate is
    /// released only once disk and memory agree again.
    async fn commit(
        &self,
        gate: OwnedMutexGuard<()>,
        next: Arc<Vec<VectorEntry>>,
    ) -> Result<(), StoreError> {
        let path = self.path.clone();
        let entries = self.entries.clone();

        tokio::spawn(async move {
            let _gate = gate;
            let written = next.clone();
            tokio::task::spawn_blocking(move || snapshot::save(&path, &written))
                .await
                .map_err(join_error)??;
            *entries.write().unwrap_or_else(|e| e.into_inner()) = next;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(join_error)?
    }

    /// Embeds `document` and appends it. On success the entry is on disk.
    pub async fn add(
        &self,
        id: impl Into<String>,
        document: impl Into<String>,
        metadata: ChunkMetadata,
    ) -> Result<(), StoreError> {
        let id = id.into();
        let document = document.into();

        // Embedding is the slow part; keep it outside the writer gate.
        let embedding = self.embedder.embed(&document).await?;
        if embedding.is_empty() {
            return Err(StoreError::Embedding(LlmError::EmptyEmbedding));
        }

        let gate = self.write_gate.clone().lock_owned().await;
        let current = self.current();

        if current.iter().any(|entry| entry.id == id) {
            return Err(StoreError::DuplicateId(id));
        }
        if let Some(expected) = current.first().map(|entry| entry.embedding.len()) {
            if expected != embedding.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(VectorEntry {
            id,
            embedding,
            document,
            metadata,
        });
        self.commit(gate, Arc::new(next)).await
    }

    /// Up to `k` entries closest to `text`, most similar first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryResult>, StoreError> {
        if k == 0 || self.count() == 0 {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let query_embedding = self.embedder.embed(text).await?;
        let entries = self.current();

        if let Some(expected) = entries.first().map(|entry| entry.embedding.len()) {
            if expected != query_embedding.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                });
            }
        }

        let ranked = rank_descending_by_cosine(
            &query_embedding,
            entries.iter().map(|entry| entry.embedding.as_slice()),
        )?;

        let results: Vec<QueryResult> = ranked
            .into_iter()
            .take(k)
            .map(|(idx, similarity)| {
                let entry = &entries[idx];
                QueryResult {
                    id: entry.id.clone(),
                    document: entry.document.clone(),
                    metadata: entry.metadata.clone(),
                    distance: 1.0 - similarity,
                }
            })
            .collect();

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Vector search over {} entries returned {}",
            entries.len(),
            results.len()
        );
        Ok(results)
    }

    /// Empties the store and persists the empty snapshot.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let gate = self.write_gate.clone().lock_owned().await;
        self.commit(gate, Arc::new(Vec::new())).await?;
        tracing::info!("Vector store cleared");
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.current().len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.current().iter().any(|entry| entry.id == id)
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.current()
            .iter()
            .any(|entry| entry.metadata.source == source)
    }

    /// Embedding length shared by all entries, if any are stored.
    pub fn dimension(&self) -> Option<usize> {
        self.current().first().map(|entry| entry.embedding.len())
    }

    /// Point-in-time copy of the collection.
    pub fn entries(&self) -> Arc<Vec<VectorEntry>> {
        self.current()
    }
}

fn join_error(err: tokio::task::JoinError) -> StoreError {
    StoreError::Persistence(std::io::Error::new(std::io::ErrorKind::Other, err))
}
