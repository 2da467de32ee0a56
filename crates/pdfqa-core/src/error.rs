//! Error taxonomy shared by the pipeline and its callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    /// The uploaded file is not a PDF.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A question was asked before any document was ingested.
    #[error("no document has been uploaded yet; upload a PDF first")]
    NoIndex,
    #[error("invalid mode '{mode}'. Available modes: {available}")]
    InvalidMode { mode: String, available: String },
    /// The PDF could be read but yielded no usable text.
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl QaError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            QaError::UnsupportedFormat(_) => "unsupported_format",
            QaError::Io(_) => "io_error",
            QaError::NoIndex => "no_index",
            QaError::InvalidMode { .. } => "invalid_mode",
            QaError::Extraction(_) => "extraction_failed",
            QaError::Embedding(_) => "embedding_failed",
        }
    }
}

pub type QaResult<T> = Result<T, QaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: QaError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), "io_error");
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn invalid_mode_lists_alternatives() {
        let err = QaError::InvalidMode {
            mode: "poem".to_string(),
            available: "default, exam".to_string(),
        };
        assert_eq!(err.to_string(), "invalid mode 'poem'. Available modes: default, exam");
    }
}
