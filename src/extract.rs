//! PDF text extraction.
//!
//! Turns uploaded bytes into an ordered list of [`Page`]s. Only PDFs are
//! accepted: the filename must end in `.pdf` and the content must start
//! with the `%PDF-` header. Extraction itself is delegated to
//! `pdf-extract`; pages that yield no text are kept (empty) so page
//! numbering matches the physical document.

use std::path::{Path, PathBuf};

use pdfqa_core::models::{Document, Page};
use pdfqa_core::{QaError, QaResult};

pub const MIME_PDF: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Whether `filename` has a `.pdf` extension (case-insensitive).
pub fn is_pdf_filename(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Check that an upload is a PDF by name and header, without parsing it.
///
/// # Errors
///
/// [`QaError::UnsupportedFormat`] if the name or header is not a PDF.
pub fn validate_pdf(filename: &str, bytes: &[u8]) -> QaResult<()> {
    if !is_pdf_filename(filename) {
        return Err(QaError::UnsupportedFormat(format!(
            "{} is not a PDF (only .pdf files are accepted)",
            filename
        )));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(QaError::UnsupportedFormat(format!(
            "{} does not have a PDF header",
            filename
        )));
    }
    Ok(())
}

/// Extract per-page text from PDF bytes.
///
/// # Errors
///
/// - [`QaError::UnsupportedFormat`] if the name or header is not a PDF.
/// - [`QaError::Extraction`] if the PDF cannot be parsed.
pub fn extract_pages(filename: &str, bytes: &[u8]) -> QaResult<Vec<Page>> {
    validate_pdf(filename, bytes)?;

    let texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| QaError::Extraction(format!("{}: {}", filename, e)))?;

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Page::new(index, text))
        .collect())
}

/// Build a [`Document`] from uploaded bytes.
pub fn document_from_bytes(filename: &str, bytes: &[u8]) -> QaResult<Document> {
    let pages = extract_pages(filename, bytes)?;
    tracing::debug!(filename, pages = pages.len(), "extracted pdf");
    Ok(Document::new(filename, pages))
}

/// Read and extract a PDF from disk. The document is named after the
/// file's basename.
pub fn load_pdf(path: &Path) -> QaResult<Document> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    if !is_pdf_filename(&filename) {
        return Err(QaError::UnsupportedFormat(format!(
            "{} is not a PDF (only .pdf files are accepted)",
            filename
        )));
    }
    let bytes = std::fs::read(path)?;
    document_from_bytes(&filename, &bytes)
}

/// [`document_from_bytes`] on the blocking thread pool.
pub async fn extract_document(filename: String, bytes: Vec<u8>) -> QaResult<Document> {
    off_runtime(move || document_from_bytes(&filename, &bytes)).await
}

/// [`load_pdf`] on the blocking thread pool.
pub async fn load_document(path: PathBuf) -> QaResult<Document> {
    off_runtime(move || load_pdf(&path)).await
}

/// Parsing is CPU-bound and pdf-extract may panic on malformed input; a
/// panic surfaces as [`QaError::Extraction`].
async fn off_runtime<F>(job: F) -> QaResult<Document>
where
    F: FnOnce() -> QaResult<Document> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| QaError::Extraction(format!("pdf extraction aborted: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_check() {
        assert!(is_pdf_filename("notes.pdf"));
        assert!(is_pdf_filename("NOTES.PDF"));
        assert!(!is_pdf_filename("notes.txt"));
        assert!(!is_pdf_filename("pdf"));
        assert!(!is_pdf_filename("notes.pdf.exe"));
    }

    #[test]
    fn non_pdf_name_is_unsupported() {
        let err = extract_pages("essay.docx", b"%PDF-1.4").unwrap_err();
        assert!(matches!(err, QaError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_header_is_unsupported() {
        let err = extract_pages("essay.pdf", b"hello world").unwrap_err();
        assert!(matches!(err, QaError::UnsupportedFormat(_)));
    }

    #[test]
    fn corrupt_pdf_is_extraction_error() {
        let err = extract_pages("broken.pdf", b"%PDF-1.4\nnot really a pdf").unwrap_err();
        assert!(matches!(err, QaError::Extraction(_)));
    }

    #[test]
    fn validate_accepts_header_only() {
        assert!(validate_pdf("essay.pdf", b"%PDF-1.7\n").is_ok());
        assert!(matches!(
            validate_pdf("essay.pdf", b"PK\x03\x04"),
            Err(QaError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn blocking_extraction_keeps_error_kinds() {
        let err = extract_document("broken.pdf".to_string(), b"%PDF-1.4\ngarbage".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::Extraction(_)));

        let err = extract_document("notes.txt".to_string(), b"%PDF-1.4".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::UnsupportedFormat(_)));

        let dir = tempfile::tempdir().unwrap();
        let err = load_document(dir.path().join("absent.pdf")).await.unwrap_err();
        assert!(matches!(err, QaError::Io(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pdf(&dir.path().join("absent.pdf")).unwrap_err();
        assert!(matches!(err, QaError::Io(_)));
    }
}
