//! Embedding provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for embedding providers (e.g., Gemini, local hashing)
///
/// Documents and queries are embedded through separate calls because some
/// providers tune the vector for its retrieval role.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document chunks, one vector per input, in order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of the vectors this embedder produces
    fn dimensions(&self) -> usize;
}
