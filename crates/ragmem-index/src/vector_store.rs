//! In-memory vector store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ragmem_core::{Error, Result, SearchConfig, SearchResult, VectorDocument, VectorStore};

/// Cosine similarity of two vectors; zero for mismatched or zero-length input
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Local in-memory vector store, lost when the process exits
#[derive(Clone, Default)]
pub struct LocalVectorStore {
    documents: Arc<RwLock<HashMap<String, VectorDocument>>>,
}

impl LocalVectorStore {
    /// Create a new local vector store
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> Error {
    Error::VectorStore(format!("Lock error: {}", e))
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn store_batch(&self, documents: Vec<VectorDocument>) -> Result<Vec<String>> {
        if let Some(missing) = documents.iter().find(|d| d.embedding.is_none()) {
            return Err(Error::VectorStore(format!(
                "document {} has no embedding",
                missing.id
            )));
        }

        let mut docs = self.documents.write().map_err(lock_error)?;
        let mut ids = Vec::with_capacity(documents.len());

        for document in documents {
            let id = document.id.clone();
            docs.insert(id.clone(), document);
            ids.push(id);
        }

        Ok(ids)
    }

    async fn search_by_vector(&self, vector: &[f32], config: &SearchConfig) -> Result<SearchResult> {
        let docs = self.documents.read().map_err(lock_error)?;

        let mut results: Vec<VectorDocument> = docs
            .values()
            .filter_map(|doc| {
                let embedding = doc.embedding.as_ref()?;
                let mut doc_with_score = doc.clone();
                doc_with_score.score = Some(cosine_similarity(vector, embedding));
                Some(doc_with_score)
            })
            .filter(|doc| match config.score_threshold {
                Some(threshold) => doc.score.unwrap_or(0.0) >= threshold,
                None => true,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .total_cmp(&a.score.unwrap_or(0.0))
                .then_with(|| a.id.cmp(&b.id))
        });

        results.truncate(config.top_k);

        let total = results.len();

        Ok(SearchResult {
            documents: results,
            total,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>> {
        let docs = self.documents.read().map_err(lock_error)?;
        Ok(docs.get(id).cloned())
    }

    async fn clear(&self) -> Result<()> {
        let mut docs = self.documents.write().map_err(lock_error)?;
        docs.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let docs = self.documents.read().map_err(lock_error)?;
        Ok(docs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, embedding: Vec<f32>) -> VectorDocument {
        VectorDocument {
            id: id.to_string(),
            content: format!("content of {}", id),
            embedding: Some(embedding),
            metadata: json!({}),
            score: None,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_local_vector_store() {
        let store = LocalVectorStore::new();

        let id = store.store(doc("test1", vec![1.0, 0.0])).await.unwrap();
        assert_eq!(id, "test1");
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get("test1").await.unwrap().is_some());

        assert!(store.get("missing").await.unwrap().is_none());

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.get("test1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let store = LocalVectorStore::new();
        store
            .store_batch(vec![
                doc("far", vec![0.0, 1.0]),
                doc("near", vec![1.0, 0.1]),
                doc("middle", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let config = SearchConfig {
            top_k: 2,
            score_threshold: None,
        };
        let results = store.search_by_vector(&[1.0, 0.0], &config).await.unwrap();
        let ids: Vec<_> = results.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "middle"]);
        assert_eq!(results.total, 2);
    }

    #[tokio::test]
    async fn test_search_applies_threshold() {
        let store = LocalVectorStore::new();
        store
            .store_batch(vec![doc("a", vec![1.0, 0.0]), doc("b", vec![0.0, 1.0])])
            .await
            .unwrap();

        let config = SearchConfig {
            top_k: 10,
            score_threshold: Some(0.5),
        };
        let results = store.search_by_vector(&[1.0, 0.0], &config).await.unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.documents[0].id, "a");
    }

    #[tokio::test]
    async fn test_document_without_embedding_is_rejected() {
        let store = LocalVectorStore::new();
        let mut missing = doc("x", vec![]);
        missing.embedding = None;

        assert!(store.store(missing).await.is_err());
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
