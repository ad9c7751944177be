//! Embedding generation and vector similarity.

mod http;

use async_trait::async_trait;
use ndarray::ArrayView1;

use crate::errors::RagError;

pub use http::HttpEmbedder;

/// Maps text into a fixed-dimension vector space.
///
/// The dimension is fixed at construction and never changes within a
/// process lifetime; changing the embedding model invalidates every stored
/// vector and is deliberately not handled here.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embed a batch of texts. A failure aborts the whole batch; callers
    /// wanting partial success must resubmit chunks individually.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Cosine similarity with degenerate inputs mapped to `0.0`.
///
/// Zero-norm or mismatched vectors never produce NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);

    let denom = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }

    (a.dot(&b) / denom).clamp(-1.0, 1.0)
}
