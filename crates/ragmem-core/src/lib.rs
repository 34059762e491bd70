//! Core traits and types for ragmem
//!
//! This crate defines the fundamental traits and types used across the ragmem system.
//! It provides capability-facing interfaces for chat models, embedders, vector stores
//! and query engines, plus the conversation memory that the chat loop owns.

pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod memory;
pub mod rag;
pub mod types;
pub mod vector_store;


pub use document::{Document, IndexingConfig, IndexingResult};
pub use embedding::Embedder;
pub use error::{Collaborator, Error, Result};
pub use llm::{ChatModel, CompletionConfig};
pub use memory::ConversationMemory;
pub use rag::{QueryEngine, Response};
pub use types::{ChatMessage, Role, Turn};
pub use vector_store::{SearchConfig, SearchResult, VectorDocument, VectorStore};
