//! In-memory semantic index over policy chunks.
//!
//! Embeds every chunk once at build time and answers top-`k` queries by
//! exact cosine scan. Results are deterministic for a fixed index and
//! query: scores use a total order and ties break on insertion order.
//! Policy documents produce a few hundred chunks at most, so the scan
//! stays well under a millisecond.

use tracing::debug;

use crate::chunking::PolicyChunk;
use crate::embedding::{Embedder, normalize};
use crate::error::IndexError;

/// A chunk matched by a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredChunk<'a> {
    /// The matched chunk.
    pub chunk: &'a PolicyChunk,
    /// Cosine similarity in `[-1, 1]` (higher is closer).
    pub score: f32,
}

/// Immutable similarity index over a chunked policy document.
pub struct PolicyIndex {
    embedder: Box<dyn Embedder>,
    chunks: Vec<PolicyChunk>,
    vectors: Vec<Vec<f32>>,
}

impl PolicyIndex {
    /// Builds the index by embedding every chunk.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if embedding fails or the backend returns
    /// a vector count or dimension that doesn't match.
    pub fn build(embedder: Box<dyn Embedder>, chunks: Vec<PolicyChunk>) -> Result<Self, IndexError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let mut vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed(&texts)?
        };

        if vectors.len() != chunks.len() {
            return Err(IndexError::Embedding {
                message: format!(
                    "backend returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                ),
            });
        }
        for vector in &mut vectors {
            if vector.len() != embedder.dimension() {
                return Err(IndexError::DimensionMismatch {
                    expected: embedder.dimension(),
                    got: vector.len(),
                });
            }
            normalize(vector);
        }

        debug!(
            chunks = chunks.len(),
            backend = embedder.id(),
            "policy index built"
        );

        Ok(Self {
            embedder,
            chunks,
            vectors,
        })
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the index holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the top-`k` chunks most similar to `text`.
    ///
    /// `k` bounds the result count; fewer results are returned when the
    /// index is smaller than `k`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if embedding the query fails.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk<'_>>, IndexError> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut query_vectors = self.embedder.embed(&[text])?;
        let Some(query_vector) = query_vectors.first_mut() else {
            return Err(IndexError::Embedding {
                message: "backend returned no vector for query".to_string(),
            });
        };
        normalize(query_vector);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(query_vector, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: &self.chunks[i],
                score,
            })
            .collect())
    }
}

impl std::fmt::Debug for PolicyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyIndex")
            .field("backend", &self.embedder.id())
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
