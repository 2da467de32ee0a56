//! Data types that flow through the ingest and query pipeline.

use serde::Serialize;
use uuid::Uuid;

/// One page of extracted text, in physical page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub text: String,
    /// Zero-based page number.
    pub index: usize,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            index,
        }
    }
}

/// An uploaded document. Immutable once created; a new upload replaces it.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Generation id, fresh for every upload (even of the same file).
    pub id: String,
    pub filename: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(filename: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A retrievable window of one page's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// `{document_id}:{sequence_index}`.
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub page_index: usize,
    /// Position of this chunk across the whole document.
    pub sequence_index: usize,
    /// Byte offset of `text` within its page.
    pub start: usize,
    /// SHA-256 of `text`.
    pub hash: String,
}

impl Chunk {
    /// Byte offset one past the end of `text` within its page.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// A chunk paired with its similarity to a query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1.0, 1.0]`; higher is more similar.
    pub score: f32,
}
