//! Offline re-indexing of a directory tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::IngestError;
use crate::core::config::ChunkingSettings;
use crate::documents::{DocumentParser, DocumentSource};
use crate::rag::{ChunkMetadata, Chunker, DocumentType, VectorStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    /// Entries in the store once the run finished.
    pub total: usize,
}

pub struct BatchIngestor {
    store: Arc<VectorStore>,
    parser: DocumentParser,
    chunker: Chunker,
}

impl BatchIngestor {
    pub fn new(
        store: Arc<VectorStore>,
        parser: DocumentParser,
        chunking: &ChunkingSettings,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            store,
            parser,
            chunker: Chunker::new(chunking.size, chunking.overlap)?,
        })
    }

    pub async fn run(&self, root: &Path) -> Result<IngestReport, IngestError> {
        self.run_with_progress(root, |_| {}).await
    }

    /// Clears the store and indexes every file under `root`, calling
    /// `on_file` after each one. Stops at the first store failure; whatever
    /// was added until then stays.
    pub async fn run_with_progress<F>(
        &self,
        root: &Path,
        mut on_file: F,
    ) -> Result<IngestReport, IngestError>
    where
        F: FnMut(&FileReport),
    {
        if !root.is_dir() {
            return Err(IngestError::Validation(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let started = Instant::now();
        let files = discover_files(root)?;
        tracing::info!("Found {} files to process under {}", files.len(), root.display());

        self.store.clear().await?;

        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            let path = file.to_string_lossy().replace('\\', "/");
            let doc_type = batch_document_type(&file);

            let text = match self.read_text(&file, doc_type).await {
                Ok(text) => text,
                Err(IngestError::Extraction(err)) => {
                    tracing::warn!("Skipping {}: {}", path, err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let chunks: Vec<String> = self
                .chunker
                .split(&text)
                .into_iter()
                .map(|chunk| chunk.text)
                .filter(|chunk| !chunk.trim().is_empty())
                .collect();

            for (index, chunk) in chunks.iter().enumerate() {
                self.store
                    .add(
                        format!("{}_{}", path, index),
                        chunk.as_str(),
                        ChunkMetadata::new(path.clone(), index, doc_type),
                    )
                    .await?;
            }

            let report = FileReport {
                path,
                chunks: chunks.len(),
            };
            tracing::info!("Indexed {} ({} chunks)", report.path, report.chunks);
            on_file(&report);
            reports.push(report);
        }

        let total = self.store.count();
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Indexed {} chunks from {} files",
            total,
            reports.len()
        );

        Ok(IngestReport {
            files: reports,
            total,
        })
    }

    async fn read_text(&self, file: &Path, doc_type: DocumentType) -> Result<String, IngestError> {
        let bytes = tokio::fs::read(file).await?;
        let source = match doc_type {
            DocumentType::Pdf => DocumentSource::Pdf(bytes),
            DocumentType::Docx => DocumentSource::Docx(bytes),
            _ => DocumentSource::Text(bytes),
        };
        Ok(self.parser.extract(source).await?)
    }
}

/// PDF and Word files go through their parsers; anything else is text.
fn batch_document_type(path: &Path) -> DocumentType {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => DocumentType::Pdf,
        Some("docx") => DocumentType::Docx,
        _ => DocumentType::Txt,
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Every file with an extension below `root`, depth first, sorted by name.
/// Hidden files and directories are skipped.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| !is_hidden(path))
            .collect();
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            if path.is_dir() {
                subdirs.push(path);
            } else if path.is_file() && path.extension().is_some() {
                found.push(path);
            }
        }
        // Reverse so the stack pops subdirectories in name order.
        pending.extend(subdirs.into_iter().rev());
    }

    found.sort();
    Ok(found)
}
