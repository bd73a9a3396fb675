use crate::rag::DocumentType;


const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOC_MIME: &str = "application/msword";

/// Classifies an upload. URLs win, then a recognised MIME type, then the
/// file extension. `None` means the upload is not supported.
pub fn detect_document_type(name: &str, mime: Option<&str>) -> Option<DocumentType> {
    let trimmed = name.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(DocumentType::Url);
    }

    let mime = mime
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    match mime.as_deref() {
        Some("application/pdf") => return Some(DocumentType::Pdf),
        Some(DOCX_MIME) | Some(DOC_MIME) => return Some(DocumentType::Docx),
        Some("text/plain") => return Some(DocumentType::Txt),
        _ => {}
    }

    let extension = trimmed.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some(DocumentType::Pdf),
        "docx" | "doc" => Some(DocumentType::Docx),
        "txt" => Some(DocumentType::Txt),
        _ => None,
    }
}

/// Rejection text naming what was refused (extension, else MIME type) and
/// what is accepted.
pub fn unsupported_type_message(name: &str, mime: Option<&str>) -> String {
    let extension = name
        .trim()
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && !ext.contains(['/', '\\']));
    let mime = mime
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    let rejected = extension.or(mime).unwrap_or_else(|| "unknown".to_string());
    format!(
        "Unsupported file type '{}'. Please upload PDF, DOCX, or TXT files.",
        rejected
    )
}
