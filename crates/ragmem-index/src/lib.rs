//! Document ingestion, vector stores and query engines for ragmem
//!
//! This crate provides the retrieval side of the system: loading files,
//! chunking and embedding them, storing the vectors, and answering questions
//! from the stored chunks.

mod chunker;
mod embedder;
mod engine;
mod indexer;
mod loader;
mod qdrant;
mod router;
mod vector_store;

#[cfg(test)]
mod tests;

pub use chunker::TextChunker;
pub use embedder::HashEmbedder;
pub use engine::VectorQueryEngine;
pub use indexer::Indexer;
pub use loader::DirectoryReader;
pub use qdrant::{QdrantConfig, QdrantVectorStore};
pub use router::{QueryEngineTool, RouterQueryEngine};
pub use vector_store::{LocalVectorStore, cosine_similarity};

// Re-export core types for convenience
pub use ragmem_core::{
    Document, Embedder, Error, IndexingConfig, IndexingResult, QueryEngine, Response, Result,
    SearchConfig, SearchResult, VectorDocument, VectorStore,
};
