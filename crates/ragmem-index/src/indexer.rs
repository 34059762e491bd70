//! Document indexer: chunk, embed and store

use futures::stream::{self, StreamExt};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use ragmem_core::{
    ChatMessage, ChatModel, Document, Embedder, IndexingConfig, IndexingResult, Result,
    VectorDocument, VectorStore,
};

use crate::chunker::TextChunker;
use crate::loader::DirectoryReader;

/// Batches embedded concurrently
const EMBED_CONCURRENCY: usize = 4;

/// Cap on document text sent along with each chunk for contextualisation
const CONTEXT_DOCUMENT_CHARS: usize = 20_000;

/// Indexes documents into any vector store with any embedder
pub struct Indexer<E: Embedder + ?Sized, V: VectorStore + ?Sized> {
    embedder: Arc<E>,
    vector_store: Arc<V>,
    config: IndexingConfig,
    chunker: TextChunker,
    contextualizer: Option<Arc<dyn ChatModel>>,
}

impl<E: Embedder + ?Sized, V: VectorStore + ?Sized> Indexer<E, V> {
    /// Create a new indexer with the default configuration
    pub fn new(embedder: Arc<E>, vector_store: Arc<V>) -> Self {
        Self::with_config(embedder, vector_store, IndexingConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(embedder: Arc<E>, vector_store: Arc<V>, config: IndexingConfig) -> Self {
        Self {
            embedder,
            vector_store,
            chunker: TextChunker::from_config(&config),
            config,
            contextualizer: None,
        }
    }

    /// Prefix every chunk with a short model-written description of where it
    /// sits in its document before embedding it
    pub fn with_contextualizer(mut self, chat_model: Arc<dyn ChatModel>) -> Self {
        self.contextualizer = Some(chat_model);
        self
    }

    async fn situate_chunk(&self, chat_model: &dyn ChatModel, document: &str, chunk: &str) -> Result<String> {
        let document: String = document.chars().take(CONTEXT_DOCUMENT_CHARS).collect();
        let prompt = format!(
            "<document>\n{}\n</document>\n\
            Here is the chunk we want to situate within the whole document\n\
            <chunk>\n{}\n</chunk>\n\
            Please give a short succinct context to situate this chunk within the overall document \
            for the purposes of improving search retrieval of the chunk. \
            Answer only with the succinct context and nothing else.",
            document, chunk
        );

        let context = chat_model.complete(&[ChatMessage::user(prompt)]).await?;
        Ok(format!("{}\n\n{}", context.trim(), chunk))
    }

    async fn prepare_chunks(&self, document: &Document) -> Vec<String> {
        let chunks = self.chunker.chunk(&document.content);
        let Some(chat_model) = self.contextualizer.as_deref() else {
            return chunks;
        };

        let mut prepared = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match self.situate_chunk(chat_model, &document.content, &chunk).await {
                Ok(text) => prepared.push(text),
                Err(e) => {
                    warn!(document = %document.id, error = %e, "chunk contextualisation failed, indexing raw chunk");
                    prepared.push(chunk);
                }
            }
        }
        prepared
    }

    async fn store_batch(
        &self,
        document: &Document,
        offset: usize,
        total_chunks: usize,
        batch: Vec<String>,
    ) -> Result<usize> {
        let embeddings = self.embedder.embed_documents(&batch).await?;

        let vector_docs: Vec<VectorDocument> = batch
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| {
                let chunk_index = offset + i;
                let mut metadata = document.metadata.clone();
                if !metadata.is_object() {
                    metadata = json!({});
                }
                metadata["chunk_index"] = json!(chunk_index);
                metadata["total_chunks"] = json!(total_chunks);
                metadata["title"] = json!(document.title);
                metadata["document_id"] = json!(document.id);
                if let Some(ref source) = document.source {
                    metadata["source"] = json!(source);
                }

                VectorDocument {
                    id: format!("{}_{}", document.id, chunk_index),
                    content,
                    embedding: Some(embedding),
                    metadata,
                    score: None,
                }
            })
            .collect();

        Ok(self.vector_store.store_batch(vector_docs).await?.len())
    }

    /// Index a single document
    pub async fn index_document(&self, document: Document) -> Result<IndexingResult> {
        let chunks = self.prepare_chunks(&document).await;
        let total_chunks = chunks.len();
        let batch_size = self.config.batch_size.max(1);

        let batches: Vec<(usize, Vec<String>)> = chunks
            .chunks(batch_size)
            .enumerate()
            .map(|(i, batch)| (i * batch_size, batch.to_vec()))
            .collect();

        let outcomes: Vec<(usize, usize, Result<usize>)> = stream::iter(batches)
            .map(|(offset, batch)| {
                let len = batch.len();
                let document = &document;
                async move {
                    let outcome = self.store_batch(document, offset, total_chunks, batch).await;
                    (offset, len, outcome)
                }
            })
            .buffered(EMBED_CONCURRENCY)
            .collect()
            .await;

        let mut result = IndexingResult::default();
        for (offset, len, outcome) in outcomes {
            match outcome {
                Ok(stored) => result.chunks_indexed += stored,
                Err(e) => {
                    result.chunks_failed += len;
                    result.errors.push(format!(
                        "Failed to store chunks {}..{} of {}: {}",
                        offset,
                        offset + len,
                        document.id,
                        e
                    ));
                }
            }
        }

        if result.chunks_indexed > 0 {
            result.documents_indexed = 1;
        }

        debug!(
            document = %document.id,
            chunks = result.chunks_indexed,
            failed = result.chunks_failed,
            "indexed document"
        );
        Ok(result)
    }

    /// Index multiple documents
    pub async fn index_documents(&self, documents: Vec<Document>) -> Result<IndexingResult> {
        let mut total = IndexingResult::default();

        for document in documents {
            let id = document.id.clone();
            match self.index_document(document).await {
                Ok(result) => total.merge(result),
                Err(e) => total.errors.push(format!("Failed to index document {}: {}", id, e)),
            }
        }

        info!(
            documents = total.documents_indexed,
            chunks = total.chunks_indexed,
            failed = total.chunks_failed,
            "indexing finished"
        );
        Ok(total)
    }

    /// Load and index every supported file under the given paths
    pub async fn index_paths<P: AsRef<Path>>(&self, reader: &DirectoryReader, paths: &[P]) -> Result<IndexingResult> {
        let documents = reader.load_all(paths).await?;
        self.index_documents(documents).await
    }
}
