// Embedding module
// Chunking of transcripts and generation of dense vectors for similarity search

pub mod chunking;
pub mod ollama;

use async_trait::async_trait;

use crate::RecallError;

/// Maps text to fixed-dimension dense vectors.
///
/// Implementations must be order-preserving and return exactly one vector per
/// input text; batching is a performance concern only. Backend failures are
/// reported as errors, never substituted with zero vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RecallError>;
}
