//! Gemini embeddings for ragmem
//!
//! This crate provides the Gemini implementation of the Embedder trait.

mod config;
mod embedder;


pub use config::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, GeminiConfig};
pub use embedder::GeminiEmbedder;

pub use ragmem_core::{Embedder, Error, Result};
