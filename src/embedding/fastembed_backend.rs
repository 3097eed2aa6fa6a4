//! FastEmbed (ONNX) embedding backend.
//!
//! Wraps the `fastembed` crate's BGE-small model. The model handle
//! requires `&mut self` to embed, so it sits behind a mutex to satisfy
//! the shared [`Embedder`](super::Embedder) interface.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::Embedder;
use crate::error::IndexError;

/// Output dimension of the BGE-small model.
const BGE_SMALL_DIMENSION: usize = 384;

/// Semantic embedder backed by `fastembed`'s BGE-small ONNX model.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    /// Initializes the ONNX model (downloads it on first use).
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] if model initialization fails.
    pub fn new() -> Result<Self, IndexError> {
        let options =
            InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options).map_err(|e| IndexError::Embedding {
            message: format!("fastembed init failed: {e}"),
        })?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for FastEmbedder {
    fn id(&self) -> &'static str {
        "fastembed"
    }

    fn dimension(&self) -> usize {
        BGE_SMALL_DIMENSION
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
        let inputs: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();
        let mut model = self.model.lock().map_err(|e| IndexError::Embedding {
            message: format!("embedder mutex poisoned: {e}"),
        })?;
        let mut vectors = model.embed(inputs, None).map_err(|e| IndexError::Embedding {
            message: format!("fastembed embed failed: {e}"),
        })?;
        for vector in &mut vectors {
            super::normalize(vector);
        }
        Ok(vectors)
    }
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model", &"<fastembed::TextEmbedding>")
            .finish()
    }
}
