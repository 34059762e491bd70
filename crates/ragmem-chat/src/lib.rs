//! Conversational layer for ragmem
//!
//! Keeps the memory of a chat session and turns follow-up questions into
//! queries a stateless query engine can answer.

mod conversation;
mod policy;
pub mod ui;

#[cfg(test)]
mod tests;

pub use conversation::ConversationalRag;
pub use policy::{ChatConfig, PolicyKind, QueryPolicy, rewrite_messages, template_query};

// Re-export core types
pub use ragmem_core::{Error, Result, Turn};
