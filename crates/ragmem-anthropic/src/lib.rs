//! Anthropic integration for ragmem
//!
//! This crate provides the Anthropic Messages API implementation of the ChatModel trait.

mod client;
mod config;


pub use client::AnthropicClient;
pub use config::{AnthropicConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL};

// Re-export core types for convenience
pub use ragmem_core::{ChatMessage, ChatModel, CompletionConfig, Error, Result};
