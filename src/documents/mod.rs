//! Document type detection and text extraction for uploads and batch ingest.

pub mod detect;
pub mod html;
pub mod parsers;

pub use detect::{detect_document_type, unsupported_type_message};
pub use html::html_to_text;
pub use parsers::{DocumentParser, DocumentSource, ExtractionError};
