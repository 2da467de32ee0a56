//! In-memory embedding index.
//!
//! Holds every chunk of one document together with its embedding vector.
//! Search is exact brute-force cosine similarity over all stored vectors,
//! which keeps results deterministic and is plenty for a single document.

use serde::Serialize;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{QaError, QaResult};
use crate::models::{Chunk, SearchHit};

struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Summary of an index, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub document_id: String,
    pub model: String,
    pub dims: usize,
    pub chunk_count: usize,
}

/// Chunks of one document plus their embeddings.
pub struct Index {
    document_id: String,
    model: String,
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl Index {
    /// Embed `chunks` and build an index over them.
    ///
    /// Chunk order is preserved; it breaks ties between equally similar
    /// chunks at search time.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> QaResult<Self> {
        let document_id = chunks
            .first()
            .map(|c| c.document_id.clone())
            .unwrap_or_default();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed(&texts).await?
        };

        if vectors.len() != chunks.len() {
            return Err(QaError::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        let dims = embedder.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(QaError::Embedding(format!(
                "model {} returned a {}-dim vector, expected {}",
                embedder.model_name(),
                bad.len(),
                dims
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Ok(Self {
            document_id,
            model: embedder.model_name().to_string(),
            dims,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            document_id: self.document_id.clone(),
            model: self.model.clone(),
            dims: self.dims,
            chunk_count: self.entries.len(),
        }
    }

    /// Embed `query` with the same model the index was built with and
    /// return the `k` most similar chunks, best first.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> QaResult<Vec<SearchHit>> {
        if embedder.model_name() != self.model || embedder.dims() != self.dims {
            return Err(QaError::Embedding(format!(
                "index was built with {} ({} dims) but queried with {} ({} dims)",
                self.model,
                self.dims,
                embedder.model_name(),
                embedder.dims()
            )));
        }
        let query_vec = embedder.embed_query(query).await?;
        Ok(self.search_by_vector(&query_vec, k))
    }

    /// Return up to `k` chunks ordered by descending cosine similarity.
    ///
    /// Returns every chunk when the index holds fewer than `k`.
    pub fn search_by_vector(&self, query_vec: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|e| SearchHit {
                chunk: e.chunk.clone(),
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }
}
