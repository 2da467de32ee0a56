//! Retriever: chunk + index at ingest time, top-k search at query time.

use crate::chunk::{split_document, ChunkParams};
use crate::embedding::Embedder;
use crate::error::{QaError, QaResult};
use crate::index::Index;
use crate::models::{Chunk, Document};

/// Number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct Retriever {
    params: ChunkParams,
}

impl Retriever {
    pub fn new(params: ChunkParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ChunkParams {
        &self.params
    }

    /// Chunk `document` and build an index over it.
    ///
    /// Fails with [`QaError::Extraction`] when no page yields any text, so
    /// an empty index is never produced.
    pub async fn ingest(&self, document: &Document, embedder: &dyn Embedder) -> QaResult<Index> {
        let chunks = split_document(document, &self.params);
        if chunks.is_empty() {
            return Err(QaError::Extraction(format!(
                "{} contains no extractable text",
                document.filename
            )));
        }
        tracing::debug!(
            document = %document.filename,
            pages = document.page_count(),
            chunks = chunks.len(),
            "chunked document"
        );
        Index::build(chunks, embedder).await
    }

    /// Return the `k` chunks most similar to `question`, best first.
    pub async fn retrieve(
        &self,
        index: Option<&Index>,
        embedder: &dyn Embedder,
        question: &str,
        k: usize,
    ) -> QaResult<Vec<Chunk>> {
        let index = index.ok_or(QaError::NoIndex)?;
        let hits = index.search(embedder, question, k).await?;
        Ok(hits.into_iter().map(|h| h.chunk).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::models::Page;

    #[tokio::test]
    async fn test_retrieve_without_index_fails() {
        let r = Retriever::default();
        let err = r
            .retrieve(None, &HashEmbedder::new(16), "why?", DEFAULT_TOP_K)
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::NoIndex));
    }

    #[tokio::test]
    async fn test_ingest_blank_document_fails() {
        let doc = Document::new("blank.pdf", vec![Page::new(0, "   "), Page::new(1, "")]);
        let err = Retriever::default()
            .ingest(&doc, &HashEmbedder::new(16))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, QaError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_ingest_then_retrieve() {
        let e = HashEmbedder::new(128);
        let doc = Document::new(
            "notes.pdf",
            vec![
                Page::new(0, "Glaciers shape mountains slowly."),
                Page::new(1, "Volcanoes erupt molten rock."),
            ],
        );
        let r = Retriever::default();
        let index = r.ingest(&doc, &e).await.unwrap();
        assert_eq!(index.len(), 2);
        let chunks = r
            .retrieve(Some(&index), &e, "volcanoes molten rock", 1)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_index, 1);
    }
}
