//! Text embedding backends for the policy index.
//!
//! Two implementations sit behind the [`Embedder`] trait:
//!
//! - [`HashedEmbedder`] — deterministic token feature hashing. Always
//!   available, needs no model download, and keeps the index fully
//!   reproducible in tests and offline environments.
//! - `FastEmbedder` — ONNX-based semantic embeddings via the `fastembed`
//!   crate, behind the `fastembed-embeddings` feature.
//!
//! [`create_embedder`] picks the best backend compiled in.

#[cfg(feature = "fastembed-embeddings")]
mod fastembed_backend;

#[cfg(feature = "fastembed-embeddings")]
pub use fastembed_backend::FastEmbedder;

use crate::error::IndexError;

/// Dimension of hashed embeddings. Matches the BGE-small dimension so
/// index layouts are identical across backends.
pub const HASHED_DIMENSION: usize = 384;

/// Embeds batches of text into fixed-dimension vectors.
///
/// For a fixed backend, embedding must be deterministic: the same text
/// always yields the same vector. The policy index relies on this for
/// reproducible similarity rankings.
pub trait Embedder: Send {
    /// Short backend identifier for logging (e.g. `"hashed"`).
    fn id(&self) -> &'static str;

    /// Output vector dimension.
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts, one vector per input in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] if the backend fails.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError>;
}

/// Creates the best embedder compiled into this build.
///
/// # Errors
///
/// Returns [`IndexError::Embedding`] if the fastembed model fails to
/// initialize (feature builds only).
pub fn create_embedder() -> Result<Box<dyn Embedder>, IndexError> {
    #[cfg(feature = "fastembed-embeddings")]
    {
        Ok(Box::new(FastEmbedder::new()?))
    }
    #[cfg(not(feature = "fastembed-embeddings"))]
    {
        Ok(Box::new(HashedEmbedder::new()))
    }
}

/// Deterministic feature-hashing embedder.
///
/// Lowercased alphanumeric tokens (and adjacent-token bigrams, for a
/// little order sensitivity) are hashed into a fixed-dimension signed
/// accumulator, then L2-normalized. Not semantically strong, but cheap,
/// dependency-free, and fully deterministic.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimension: usize,
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl HashedEmbedder {
    /// Creates an embedder with the default dimension.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dimension: HASHED_DIMENSION,
        }
    }

    /// Creates an embedder with a custom dimension (tests use small ones).
    #[must_use]
    pub const fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut bump = |key: &str, weight: f32| {
            let hash = fnv1a(key.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * weight;
        };

        for token in &tokens {
            bump(token, 1.0);
        }
        for pair in tokens.windows(2) {
            bump(&format!("{} {}", pair[0], pair[1]), 0.5);
        }

        normalize(&mut vector);
        vector
    }
}

impl Embedder for HashedEmbedder {
    fn id(&self) -> &'static str {
        "hashed"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// L2-normalizes a vector in place. Zero vectors are left untouched.
pub(crate) fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_deterministic() {
        let embedder = HashedEmbedder::new();
        let a = embedder.embed(&["refund after cancellation"]);
        let b = embedder.embed(&["refund after cancellation"]);
        assert_eq!(a.unwrap_or_default(), b.unwrap_or_default());
    }

    #[test]
    fn test_hashed_dimension() {
        let embedder = HashedEmbedder::with_dimension(32);
        let vectors = embedder.embed(&["tarmac delay"]).unwrap_or_default();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 32);
    }

    #[test]
    fn test_hashed_normalized() {
        let embedder = HashedEmbedder::new();
        let vectors = embedder
            .embed(&["baggage liability limits for domestic flights"])
            .unwrap_or_default();
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashed_empty_text_is_zero_vector() {
        let embedder = HashedEmbedder::new();
        let vectors = embedder.embed(&[""]).unwrap_or_default();
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_different_texts_differ() {
        let embedder = HashedEmbedder::new();
        let vectors = embedder
            .embed(&["overbooking compensation", "meal vouchers"])
            .unwrap_or_default();
        assert_ne!(vectors[0], vectors[1]);
    }

    #[test]
    fn test_similar_texts_score_higher() {
        let embedder = HashedEmbedder::new();
        let vectors = embedder
            .embed(&[
                "refund to credit card after cancellation",
                "credit card refund timing after a cancellation",
                "tarmac delay food and water requirements",
            ])
            .unwrap_or_default();
        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(dot(&vectors[0], &vectors[1]) > dot(&vectors[0], &vectors[2]));
    }

    #[test]
    fn test_create_embedder_available() {
        let embedder = create_embedder();
        assert!(embedder.is_ok());
    }
}
