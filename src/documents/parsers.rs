use std::io::{Cursor, Read};
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use zip::ZipArchive;

use super::html::{decode_entities, html_to_text};
use crate::rag::DocumentType;

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to parse PDF file: {0}")]
    Pdf(String),
    #[error("Failed to parse DOCX file: {0}")]
    Docx(String),
    #[error("Failed to parse website: {0}")]
    Website(String),
    #[error("Failed to parse website: HTTP {status}")]
    HttpStatus { status: u16 },
    #[error("parser setup failed: {0}")]
    Setup(String),
}

/// Raw input to text extraction.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Pdf(Vec<u8>),
    Docx(Vec<u8>),
    Text(Vec<u8>),
    Url(String),
}

impl DocumentSource {
    pub fn from_bytes(doc_type: DocumentType, bytes: Vec<u8>) -> Self {
        match doc_type {
            DocumentType::Pdf => DocumentSource::Pdf(bytes),
            DocumentType::Docx => DocumentSource::Docx(bytes),
            DocumentType::Txt => DocumentSource::Text(bytes),
            DocumentType::Url => {
                DocumentSource::Url(String::from_utf8_lossy(&bytes).trim().to_string())
            }
        }
    }

    pub fn doc_type(&self) -> DocumentType {
        match self {
            DocumentSource::Pdf(_) => DocumentType::Pdf,
            DocumentSource::Docx(_) => DocumentType::Docx,
            DocumentSource::Text(_) => DocumentType::Txt,
            DocumentSource::Url(_) => DocumentType::Url,
        }
    }
}

/// Turns PDFs, Word documents, plain text and web pages into plain text.
#[derive(Clone)]
pub struct DocumentParser {
    client: Client,
    fetch_timeout: Duration,
    docx_tokens: Regex,
}

impl DocumentParser {
    pub fn new(fetch_timeout: Duration) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .user_agent(concat!("ragdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractionError::Setup(e.to_string()))?;
        // Text runs, paragraph ends, tabs and line breaks, in document order.
        let docx_tokens = Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|</w:p>|<w:tab/>|<w:br/>")
            .map_err(|e| ExtractionError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            fetch_timeout,
            docx_tokens,
        })
    }

    pub async fn extract(&self, source: DocumentSource) -> Result<String, ExtractionError> {
        match source {
            DocumentSource::Text(bytes) => Ok(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            }),
            DocumentSource::Pdf(bytes) => {
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| ExtractionError::Pdf(e.to_string()))?
                    .map_err(|e| ExtractionError::Pdf(e.to_string()))
            }
            DocumentSource::Docx(bytes) => {
                let tokens = self.docx_tokens.clone();
                tokio::task::spawn_blocking(move || extract_docx(&bytes, &tokens))
                    .await
                    .map_err(|e| ExtractionError::Docx(e.to_string()))?
            }
            DocumentSource::Url(url) => self.fetch_website(&url).await,
        }
    }

    async fn fetch_website(&self, url: &str) -> Result<String, ExtractionError> {
        tracing::info!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| ExtractionError::Website(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| ExtractionError::Website(e.to_string()))?;
        Ok(html_to_text(&html))
    }
}

fn extract_docx(bytes: &[u8], tokens: &Regex) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a DOCX archive ({})", e)))?;
    let mut entry = archive
        .by_name(DOCX_BODY)
        .map_err(|_| ExtractionError::Docx(format!("missing {}", DOCX_BODY)))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;

    Ok(docx_xml_to_text(&xml, tokens))
}

fn docx_xml_to_text(xml: &str, tokens: &Regex) -> String {
    let mut text = String::new();
    for caps in tokens.captures_iter(xml) {
        match caps.get(1) {
            Some(run) => text.push_str(&decode_entities(run.as_str())),
            None => match caps.get(0).map(|m| m.as_str()) {
                Some("<w:tab/>") => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn parser() -> DocumentParser {
        DocumentParser::new(Duration::from_secs(5)).unwrap()
    }

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file(DOCX_BODY, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn text_is_returned_verbatim() {
        let text = parser()
            .extract(DocumentSource::Text("  line one\nline two  ".as_bytes().to_vec()))
            .await
            .unwrap();
        assert_eq!(text, "  line one\nline two  ");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_rejected() {
        let text = parser()
            .extract(DocumentSource::Text(vec![b'o', b'k', 0xff]))
            .await
            .unwrap();
        assert_eq!(text, "ok\u{fffd}");
    }

    #[tokio::test]
    async fn docx_paragraphs_runs_and_tabs() {
        let body = r#"<w:document><w:body>
<w:p><w:r><w:t>Refund</w:t></w:r><w:r><w:t xml:space="preserve"> policy &amp; terms</w:t></w:r></w:p>
<w:p><w:r><w:t>Item</w:t><w:tab/><w:t>Price</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#;

        let text = parser()
            .extract(DocumentSource::Docx(docx_with_body(body)))
            .await
            .unwrap();
        assert_eq!(text, "Refund policy & terms\nItem\tPrice\ncell");
    }

    #[tokio::test]
    async fn non_zip_docx_is_an_extraction_error() {
        let err = parser()
            .extract(DocumentSource::Docx(b"plain bytes".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Docx(_)));
        assert!(err.to_string().starts_with("Failed to parse DOCX file"));
    }

    #[tokio::test]
    async fn garbage_pdf_is_an_extraction_error() {
        let err = parser()
            .extract(DocumentSource::Pdf(b"%PDF-broken".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)));
    }

    #[test]
    fn url_bytes_become_a_url_source() {
        let source = DocumentSource::from_bytes(DocumentType::Url, b" https://a.example/x ".to_vec());
        assert!(matches!(&source, DocumentSource::Url(u) if u == "https://a.example/x"));
        assert_eq!(source.doc_type(), DocumentType::Url);
    }
}
