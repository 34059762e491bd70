//! Anthropic Messages API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use ragmem_core::{ChatMessage, ChatModel, CompletionConfig, Error, Result, Role};

use crate::config::AnthropicConfig;

/// Anthropic chat client
pub struct AnthropicClient {
    config: AnthropicConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

impl AnthropicClient {
    /// Model constants
    pub const CLAUDE_3_SONNET: &'static str = "claude-3-sonnet-20240229";
    pub const CLAUDE_3_5_SONNET: &'static str = "claude-3-5-sonnet-20240620";

    /// Create a new Anthropic client from configuration
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new Anthropic client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = AnthropicConfig::from_env()?;
        Self::new(config)
    }

    /// Set the model to use for completions
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.config.model = model_id.into();
        self
    }

    fn default_completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model_id: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            timeout: Duration::from_secs(self.config.timeout_secs),
        }
    }

    /// Split system messages out of the conversation.
    ///
    /// The Messages API takes the system prompt as a top-level field, so every
    /// system message is joined into it regardless of its position.
    fn build_request(messages: &[ChatMessage], config: &CompletionConfig) -> MessagesRequest {
        let mut system_parts = Vec::new();
        let mut payload = Vec::new();

        for message in messages {
            match message.role {
                Role::System => system_parts.push(message.content.clone()),
                Role::User => payload.push(MessagePayload {
                    role: "user",
                    content: message.content.clone(),
                }),
                Role::Assistant => payload.push(MessagePayload {
                    role: "assistant",
                    content: message.content.clone(),
                }),
            }
        }

        MessagesRequest {
            model: config.model_id.clone(),
            max_tokens: config.max_tokens,
            messages: payload,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n"))
            },
        }
    }

    /// Perform the actual messages request
    async fn perform_completion(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<String> {
        if messages.iter().all(|m| m.role == Role::System) {
            return Err(Error::InvalidInput(
                "at least one user or assistant message is required".to_string(),
            ));
        }

        let request_body = Self::build_request(messages, config);
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        debug!(model = %request_body.model, messages = request_body.messages.len(), "sending chat completion");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication(format!(
                "Anthropic API rejected the API key: {}",
                status
            )));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ChatModel(format!(
                "Anthropic API request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        debug!(stop_reason = ?parsed.stop_reason, "chat completion finished");

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let config = self.default_completion_config();
        self.complete_with_config(messages, &config).await
    }

    async fn complete_with_config(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<String> {
        let completion_future = self.perform_completion(messages, config);

        match timeout(config.timeout, completion_future).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("Chat completion timed out".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
