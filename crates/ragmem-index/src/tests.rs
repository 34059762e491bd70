//! End-to-end tests for the retrieval pipeline

#[cfg(test)]
mod pipeline_tests {
    use crate::{
        DirectoryReader, HashEmbedder, Indexer, LocalVectorStore, QueryEngine, SearchConfig,
        VectorQueryEngine, VectorStore,
    };
    use async_trait::async_trait;
    use insta::assert_yaml_snapshot;
    use ragmem_core::{ChatMessage, ChatModel, IndexingConfig, Result};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Answers with the first line of context it was given
    struct EchoContext;

    #[async_trait]
    impl ChatModel for EchoContext {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            let line = prompt
                .lines()
                .find(|line| line.starts_with("1. "))
                .unwrap_or("no context");
            Ok(line.to_string())
        }

        fn model_id(&self) -> &str {
            "echo-context"
        }
    }

    #[tokio::test]
    async fn test_index_directory_then_query() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("balance_sheet.txt"),
            "Total marketable securities on June 29 2024 were 153 billion dollars.",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("dynamo.md"),
            "Dynamo uses consistent hashing to partition data across nodes.",
        )
        .unwrap();

        let embedder = Arc::new(HashEmbedder::default());
        let store = Arc::new(LocalVectorStore::new());
        let indexer = Indexer::with_config(
            embedder.clone(),
            store.clone(),
            IndexingConfig {
                chunk_size: 500,
                chunk_overlap: 50,
                batch_size: 4,
            },
        );

        let result = indexer
            .index_paths(&DirectoryReader::new(), &[dir.path()])
            .await
            .unwrap();

        assert_yaml_snapshot!(result, @r###"
        documents_indexed: 2
        chunks_indexed: 2
        chunks_failed: 0
        errors: []
        "###);
        assert_eq!(store.count().await.unwrap(), 2);

        let engine = VectorQueryEngine::new(embedder, store, Arc::new(EchoContext))
            .with_search_config(SearchConfig {
                top_k: 1,
                score_threshold: None,
            });

        let response = engine
            .query("total marketable securities June 2024")
            .await
            .unwrap();

        assert_eq!(
            response.text,
            "1. [balance_sheet.txt] Total marketable securities on June 29 2024 were 153 billion dollars."
        );
        assert_eq!(response.sources[0].metadata["title"], "balance_sheet.txt");
    }
}
