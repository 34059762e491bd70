//! Chat model trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ChatMessage, Result};

/// Configuration for a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model_id: "claude-3-sonnet-20240229".to_string(),
            max_tokens: 1024,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Trait for chat-completion providers (e.g., Anthropic)
///
/// Implementations receive an ordered list of role-tagged messages and return
/// the completion text. System messages may appear anywhere in the list; it is
/// up to the provider to place them where its API expects them.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a conversation with the provider's default configuration
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Complete a conversation with a custom configuration. Models without
    /// per-request settings ignore `config`.
    async fn complete_with_config(
        &self,
        messages: &[ChatMessage],
        _config: &CompletionConfig,
    ) -> Result<String> {
        self.complete(messages).await
    }

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
