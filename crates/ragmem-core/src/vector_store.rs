//! Vector store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A document stored in the vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: serde_json::Value,
    pub score: Option<f32>,
}

impl VectorDocument {
    /// Title recorded in the metadata at indexing time, if any
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|t| t.as_str())
    }
}

/// Search result from vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub documents: Vec<VectorDocument>,
    pub total: usize,
}

/// Configuration for vector search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub score_threshold: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            score_threshold: None,
        }
    }
}

/// Trait for vector stores (e.g., Qdrant, in-memory)
///
/// This trait defines the interface for vector database operations.
/// Documents are stored with their embedding; search is by query vector.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a document in the vector store
    async fn store(&self, document: VectorDocument) -> Result<String> {
        let mut ids = self.store_batch(vec![document]).await?;
        ids.pop()
            .ok_or_else(|| crate::Error::VectorStore("store returned no id".to_string()))
    }

    /// Store multiple documents in batch
    async fn store_batch(&self, documents: Vec<VectorDocument>) -> Result<Vec<String>>;

    /// Search using a vector embedding
    async fn search_by_vector(&self, vector: &[f32], config: &SearchConfig) -> Result<SearchResult>;

    /// Get a document by ID
    async fn get(&self, id: &str) -> Result<Option<VectorDocument>>;

    /// Clear all documents from the store
    async fn clear(&self) -> Result<()>;

    /// Get the total number of documents
    async fn count(&self) -> Result<usize>;
}
