//! Retrieval-augmented query engine over a vector store

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use ragmem_core::{
    ChatMessage, ChatModel, Embedder, QueryEngine, Response, Result, SearchConfig,
    VectorDocument, VectorStore,
};

const ANSWER_INSTRUCTIONS: &str = "You are an expert Q&A system. Always answer the query using \
the provided context information, and not prior knowledge. Never directly reference the given \
context in your answer.";

/// Answers questions from the chunks most similar to the query
pub struct VectorQueryEngine<E: Embedder + ?Sized, V: VectorStore + ?Sized> {
    embedder: Arc<E>,
    vector_store: Arc<V>,
    chat_model: Arc<dyn ChatModel>,
    search_config: SearchConfig,
}

impl<E: Embedder + ?Sized, V: VectorStore + ?Sized> VectorQueryEngine<E, V> {
    pub fn new(embedder: Arc<E>, vector_store: Arc<V>, chat_model: Arc<dyn ChatModel>) -> Self {
        Self {
            embedder,
            vector_store,
            chat_model,
            search_config: SearchConfig::default(),
        }
    }

    pub fn with_search_config(mut self, search_config: SearchConfig) -> Self {
        self.search_config = search_config;
        self
    }

    /// Embed the query and fetch the closest chunks
    pub async fn retrieve(&self, query: &str) -> Result<Vec<VectorDocument>> {
        let vector = self.embedder.embed_query(query).await?;
        let result = self
            .vector_store
            .search_by_vector(&vector, &self.search_config)
            .await?;
        debug!(query, hits = result.total, "retrieved chunks");
        Ok(result.documents)
    }

    /// Build context from retrieved documents
    pub fn build_context(documents: &[VectorDocument]) -> String {
        if documents.is_empty() {
            return String::new();
        }

        let mut context = String::new();
        for (i, doc) in documents.iter().enumerate() {
            context.push_str(&format!("{}. ", i + 1));

            if let Some(title) = doc.title() {
                context.push_str(&format!("[{}] ", title));
            }

            context.push_str(&doc.content);
            context.push_str("\n\n");
        }

        context
    }

    fn build_prompt(query: &str, documents: &[VectorDocument]) -> String {
        let context = Self::build_context(documents);
        let context = if context.is_empty() {
            "No relevant context was found.\n".to_string()
        } else {
            context
        };

        format!(
            "Context information is below.\n\
            ---------------------\n\
            {}\
            ---------------------\n\
            Given the context information and not prior knowledge, answer the query.\n\
            Query: {}\n\
            Answer:",
            context, query
        )
    }
}

#[async_trait]
impl<E: Embedder + ?Sized + 'static, V: VectorStore + ?Sized + 'static> QueryEngine for VectorQueryEngine<E, V> {
    async fn query(&self, query: &str) -> Result<Response> {
        let sources = self.retrieve(query).await?;
        let prompt = Self::build_prompt(query, &sources);

        let messages = [
            ChatMessage::system(ANSWER_INSTRUCTIONS),
            ChatMessage::user(prompt),
        ];
        let text = self.chat_model.complete(&messages).await?;

        Ok(Response::new(text).with_sources(sources))
    }
}
