//! Session state: the active document index and its conversation log.
//!
//! A [`Session`] holds at most one document at a time. Ingesting a new
//! document builds its index completely before swapping it in, so readers
//! never observe a partially built index and a failed ingest leaves the
//! previous document (and its history) in place. A successful ingest
//! clears the conversation log.
//!
//! The session is shared between request handlers as `Arc<Session>`;
//! state lives behind a `tokio::sync::RwLock` and the index itself behind
//! an `Arc`, so questions run against a snapshot without holding the lock.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use pdfqa_core::embedding::Embedder;
use pdfqa_core::index::Index;
use pdfqa_core::models::{Chunk, Document, Page};
use pdfqa_core::modes::{self, Mode};
use pdfqa_core::query::QueryParts;
use pdfqa_core::retrieve::Retriever;
use pdfqa_core::synth::synthesize;
use pdfqa_core::QaResult;

use crate::config::Config;
use crate::extract;

/// One answered question.
#[derive(Debug, Clone, Serialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    pub mode: Mode,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub filename: String,
    pub page_count: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub mode: Mode,
    /// Retrieved chunks, best match first.
    pub sources: Vec<Chunk>,
    /// Full rendered prompt, for inspection.
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub pdf_loaded: bool,
    pub current_pdf: Option<String>,
    pub index_ready: bool,
    pub history_count: usize,
    pub chunk_count: usize,
}

#[derive(Default)]
struct SessionState {
    index: Option<Arc<Index>>,
    current_pdf: Option<String>,
    history: Vec<QaRecord>,
}

pub struct Session {
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    top_k: usize,
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new(embedder: Arc<dyn Embedder>, retriever: Retriever, top_k: usize) -> Self {
        Self {
            embedder,
            retriever,
            top_k: top_k.max(1),
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn from_config(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(
            embedder,
            Retriever::new(config.chunking.params()),
            config.retrieval.top_k,
        )
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Read, extract, and ingest a PDF from disk.
    pub async fn ingest_pdf(&self, path: &Path) -> QaResult<IngestSummary> {
        let document = extract::load_document(path.to_path_buf()).await?;
        self.ingest_document(document).await
    }

    /// Extract and ingest an uploaded PDF.
    pub async fn ingest_bytes(&self, filename: &str, bytes: &[u8]) -> QaResult<IngestSummary> {
        let document = extract::extract_document(filename.to_string(), bytes.to_vec()).await?;
        self.ingest_document(document).await
    }

    /// Ingest already-extracted pages.
    pub async fn ingest_pages(&self, filename: &str, pages: Vec<Page>) -> QaResult<IngestSummary> {
        self.ingest_document(Document::new(filename, pages)).await
    }

    async fn ingest_document(&self, document: Document) -> QaResult<IngestSummary> {
        let index = match self.retriever.ingest(&document, self.embedder.as_ref()).await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(filename = %document.filename, error = %e, "ingest failed");
                return Err(e);
            }
        };

        let summary = IngestSummary {
            filename: document.filename.clone(),
            page_count: document.page_count(),
            chunk_count: index.len(),
        };

        let mut state = self.state.write().await;
        state.index = Some(Arc::new(index));
        state.current_pdf = Some(document.filename);
        state.history.clear();
        drop(state);

        tracing::info!(
            filename = %summary.filename,
            pages = summary.page_count,
            chunks = summary.chunk_count,
            "document ingested"
        );
        Ok(summary)
    }

    /// Answer `question` from the current document in the given mode.
    ///
    /// # Errors
    ///
    /// - [`pdfqa_core::QaError::NoIndex`] if nothing has been ingested.
    /// - [`pdfqa_core::QaError::InvalidMode`] for an unknown mode.
    pub async fn ask(&self, question: &str, mode: &str) -> QaResult<Answer> {
        let index = self.state.read().await.index.clone();
        let index = index.ok_or(pdfqa_core::QaError::NoIndex)?;
        let mode: Mode = mode.parse()?;

        let sources = self
            .retriever
            .retrieve(Some(index.as_ref()), self.embedder.as_ref(), question, self.top_k)
            .await?;
        let parts = QueryParts::from_chunks(&sources, question, mode);
        let prompt = parts.render();
        tracing::debug!(%prompt, "rendered prompt");
        let answer = synthesize(&parts);

        let mut state = self.state.write().await;
        // Skip logging if a new document replaced the index meanwhile.
        let same_document = state
            .index
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &index));
        if same_document {
            state.history.push(QaRecord {
                question: question.to_string(),
                answer: answer.clone(),
                mode,
                timestamp: Utc::now(),
            });
        }
        drop(state);

        tracing::info!(%mode, sources = sources.len(), "question answered");
        Ok(Answer {
            answer,
            mode,
            sources,
            prompt,
        })
    }

    pub async fn history(&self) -> Vec<QaRecord> {
        self.state.read().await.history.clone()
    }

    pub async fn clear_history(&self) {
        self.state.write().await.history.clear();
    }

    pub async fn current_pdf(&self) -> Option<String> {
        self.state.read().await.current_pdf.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.state.read().await;
        SessionStatus {
            pdf_loaded: state.current_pdf.is_some(),
            current_pdf: state.current_pdf.clone(),
            index_ready: state.index.is_some(),
            history_count: state.history.len(),
            chunk_count: state.index.as_ref().map_or(0, |i| i.len()),
        }
    }

    pub fn list_modes(&self) -> Vec<&'static str> {
        modes::available_modes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_core::embedding::HashEmbedder;
    use pdfqa_core::QaError;

    fn session() -> Session {
        Session::new(Arc::new(HashEmbedder::new(128)), Retriever::default(), 4)
    }

    #[tokio::test]
    async fn test_ask_before_ingest_fails() {
        let err = session().ask("anything?", "default").await.unwrap_err();
        assert!(matches!(err, QaError::NoIndex));
    }

    #[tokio::test]
    async fn test_invalid_mode_is_not_logged() {
        let s = session();
        s.ingest_pages("a.pdf", vec![Page::new(0, "Rivers flow downhill.")])
            .await
            .unwrap();
        let err = s.ask("rivers?", "poetry").await.unwrap_err();
        assert!(matches!(err, QaError::InvalidMode { .. }));
        assert!(s.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_tracks_ingest_and_history() {
        let s = session();
        let before = s.status().await;
        assert!(!before.pdf_loaded && !before.index_ready);

        s.ingest_pages("a.pdf", vec![Page::new(0, "Rivers flow downhill.")])
            .await
            .unwrap();
        s.ask("Where do rivers flow?", "summary").await.unwrap();

        let after = s.status().await;
        assert_eq!(after.current_pdf.as_deref(), Some("a.pdf"));
        assert!(after.index_ready);
        assert_eq!(after.history_count, 1);
        assert_eq!(after.chunk_count, 1);

        s.clear_history().await;
        assert_eq!(s.status().await.history_count, 0);
    }
}
