//! Query engine trait and response type

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, VectorDocument};

/// Answer produced by a query engine, with the chunks it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    pub sources: Vec<VectorDocument>,
}

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<VectorDocument>) -> Self {
        self.sources = sources;
        self
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Trait for retrieval-augmented query engines
///
/// A query engine takes a question, retrieves supporting text from its index
/// and returns a synthesized answer.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn query(&self, query: &str) -> Result<Response>;
}
