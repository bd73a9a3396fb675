use reqwest::Url;
use serde::Serialize;

use super::IngestError;
use crate::core::config::ChunkingSettings;
use crate::documents::{
    detect_document_type, unsupported_type_message, DocumentParser, DocumentSource,
};
use crate::rag::{ChunkMetadata, Chunker, DocumentType, VectorStore};

/// One item submitted for indexing.
#[derive(Debug, Clone)]
pub enum Upload {
    File {
        filename: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub text_length: usize,
    pub chunks_created: usize,
    pub chunks_added: usize,
}

/// Last path component of a client-supplied filename.
fn display_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

fn resolve(upload: Upload) -> Result<(String, DocumentSource), IngestError> {
    match upload {
        Upload::Url(raw) => {
            let raw = raw.trim();
            let url = Url::parse(raw)
                .map_err(|_| IngestError::Validation(format!("Invalid URL: {}", raw)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(IngestError::Validation(
                    "Only http and https URLs are supported".to_string(),
                ));
            }
            let host = url
                .host_str()
                .ok_or_else(|| IngestError::Validation(format!("URL has no host: {}", raw)))?
                .to_string();
            Ok((host, DocumentSource::Url(url.to_string())))
        }
        Upload::File {
            filename,
            content_type,
            bytes,
        } => {
            let name = display_name(&filename).to_string();
            if name.is_empty() {
                return Err(IngestError::Validation(
                    "Uploaded file has no name".to_string(),
                ));
            }
            let doc_type =
                detect_document_type(&name, content_type.as_deref()).ok_or_else(|| {
                    IngestError::Validation(unsupported_type_message(
                        &name,
                        content_type.as_deref(),
                    ))
                })?;
            Ok((name, DocumentSource::from_bytes(doc_type, bytes)))
        }
    }
}

/// Extracts, chunks and indexes one document. Everything the request can
/// get wrong is rejected before the store is touched.
pub async fn ingest_document(
    store: &VectorStore,
    parser: &DocumentParser,
    chunking: &ChunkingSettings,
    upload: Upload,
) -> Result<IngestStats, IngestError> {
    let chunker = Chunker::new(chunking.size, chunking.overlap)?;
    let (source, document) = resolve(upload)?;
    let doc_type = document.doc_type();

    if store.contains_source(&source) {
        return Err(IngestError::AlreadyIndexed(source));
    }

    tracing::info!("Processing {} ({})", source, doc_type);
    let text = parser.extract(document).await?;
    if text.trim().is_empty() {
        return Err(IngestError::Validation(
            "Could not extract text from the document".to_string(),
        ));
    }
    let text_length = text.chars().count();
    tracing::info!("Extracted {} characters from {}", text_length, source);

    let chunks = chunker.split(&text);
    let mut chunks_added = 0;
    for chunk in &chunks {
        let body = chunk.text.trim();
        if body.chars().count() <= chunking.min_chunk_chars {
            continue;
        }
        store
            .add(
                format!("{}-chunk-{}", source, chunk.chunk_index),
                body,
                ChunkMetadata::new(source.clone(), chunk.chunk_index, doc_type),
            )
            .await?;
        chunks_added += 1;
    }

    tracing::info!(
        "Added {} of {} chunks from {} to the vector store",
        chunks_added,
        chunks.len(),
        source
    );

    Ok(IngestStats {
        source,
        doc_type,
        text_length,
        chunks_created: chunks.len(),
        chunks_added,
    })
}
