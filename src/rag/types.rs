use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of document a chunk was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    #[default]
    Txt,
    Url,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Txt => "txt",
            DocumentType::Url => "url",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File path, upload filename or URL hostname.
    pub source: String,
    /// Zero-based chunk position within the source.
    pub chunk: usize,
    #[serde(rename = "type", default)]
    pub doc_type: DocumentType,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>, chunk: usize, doc_type: DocumentType) -> Self {
        Self {
            source: source.into(),
            chunk,
            doc_type,
        }
    }
}

/// One stored chunk. Immutable once added to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    /// `1 - cosine similarity`; lower is closer.
    pub distance: f32,
}

/// Citation returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub source: String,
    pub chunk: usize,
}

impl From<&ChunkMetadata> for Source {
    fn from(metadata: &ChunkMetadata) -> Self {
        Self {
            source: metadata.source.clone(),
            chunk: metadata.chunk,
        }
    }
}
