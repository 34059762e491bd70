//! Routing queries between several query engines
//!
//! Each engine is wrapped in a [`QueryEngineTool`] with a description of what
//! it knows about. The router asks a chat model which tool fits the question
//! and forwards the question to it.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use ragmem_core::{ChatMessage, ChatModel, Error, QueryEngine, Response, Result};

static CHOICE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+").expect("valid regex")
});

/// A query engine with a name and a description used for routing
#[derive(Clone)]
pub struct QueryEngineTool {
    pub name: String,
    pub description: String,
    pub engine: Arc<dyn QueryEngine>,
}

impl QueryEngineTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            engine,
        }
    }
}

/// Picks one tool per query with a chat model and delegates to it
pub struct RouterQueryEngine {
    tools: Vec<QueryEngineTool>,
    selector: Arc<dyn ChatModel>,
}

impl RouterQueryEngine {
    pub fn new(tools: Vec<QueryEngineTool>, selector: Arc<dyn ChatModel>) -> Result<Self> {
        if tools.is_empty() {
            return Err(Error::InvalidInput(
                "router needs at least one tool".to_string(),
            ));
        }
        Ok(Self { tools, selector })
    }

    pub fn tools(&self) -> &[QueryEngineTool] {
        &self.tools
    }

    fn selection_prompt(&self, query: &str) -> String {
        let mut prompt = String::from(
            "Some choices are given below. It is provided in a numbered list (1 to N), \
            where each item in the list corresponds to a summary.\n---------------------\n",
        );
        for (i, tool) in self.tools.iter().enumerate() {
            prompt.push_str(&format!("({}) {}: {}\n", i + 1, tool.name, tool.description));
        }
        prompt.push_str(&format!(
            "---------------------\n\
            Using only the choices above and not prior knowledge, return the choice that is most \
            relevant to the question: '{}'\n\
            Answer with the number of the choice only.",
            query
        ));
        prompt
    }

    /// Map the selector's reply onto a tool index
    fn parse_choice(&self, reply: &str) -> Option<usize> {
        if let Some(number) = CHOICE_NUMBER.find(reply) {
            if let Ok(choice) = number.as_str().parse::<usize>() {
                if (1..=self.tools.len()).contains(&choice) {
                    return Some(choice - 1);
                }
            }
        }

        let reply = reply.to_lowercase();
        self.tools
            .iter()
            .position(|tool| reply.contains(&tool.name.to_lowercase()))
    }

    /// Choose the tool for a query
    pub async fn select(&self, query: &str) -> Result<&QueryEngineTool> {
        if self.tools.len() == 1 {
            return Ok(&self.tools[0]);
        }

        let reply = self
            .selector
            .complete(&[ChatMessage::user(self.selection_prompt(query))])
            .await?;

        let index = self.parse_choice(&reply).ok_or_else(|| {
            Error::ChatModel(format!("could not pick a tool from reply: {}", reply.trim()))
        })?;

        let tool = &self.tools[index];
        debug!(query, tool = %tool.name, "routed query");
        Ok(tool)
    }
}

#[async_trait]
impl QueryEngine for RouterQueryEngine {
    async fn query(&self, query: &str) -> Result<Response> {
        let tool = self.select(query).await?;
        tool.engine.query(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine(&'static str);

    #[async_trait]
    impl QueryEngine for FixedEngine {
        async fn query(&self, _query: &str) -> Result<Response> {
            Ok(Response::new(self.0))
        }
    }

    struct Selector(&'static str);

    #[async_trait]
    impl ChatModel for Selector {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_id(&self) -> &str {
            "selector"
        }
    }

    fn tools() -> Vec<QueryEngineTool> {
        vec![
            QueryEngineTool::new(
                "fin_stmt",
                "Use this tool for accessing financial statements",
                Arc::new(FixedEngine("from statements")),
            ),
            QueryEngineTool::new(
                "stock_prices",
                "Use this tool for accessing stock prices",
                Arc::new(FixedEngine("from prices")),
            ),
        ]
    }

    #[tokio::test]
    async fn test_routes_by_number() {
        let router = RouterQueryEngine::new(tools(), Arc::new(Selector("(2)"))).unwrap();
        let response = router.query("AAPL close on 2017-01-03?").await.unwrap();
        assert_eq!(response.text, "from prices");
    }

    #[tokio::test]
    async fn test_routes_by_name_when_no_number() {
        let router = RouterQueryEngine::new(tools(), Arc::new(Selector("Use FIN_STMT."))).unwrap();
        let response = router.query("net income?").await.unwrap();
        assert_eq!(response.text, "from statements");
    }

    #[tokio::test]
    async fn test_out_of_range_choice_fails() {
        let router = RouterQueryEngine::new(tools(), Arc::new(Selector("7"))).unwrap();
        let err = router.query("?").await.unwrap_err();
        assert!(matches!(err, Error::ChatModel(_)));
    }

    #[tokio::test]
    async fn test_single_tool_skips_selection() {
        let single = tools().into_iter().take(1).collect();
        let router = RouterQueryEngine::new(single, Arc::new(Selector("nonsense"))).unwrap();
        assert_eq!(router.query("anything").await.unwrap().text, "from statements");
    }

    #[test]
    fn test_router_requires_tools() {
        assert!(RouterQueryEngine::new(Vec::new(), Arc::new(Selector("1"))).is_err());
    }

    #[test]
    fn test_selection_prompt_lists_tools() {
        let router = RouterQueryEngine::new(tools(), Arc::new(Selector("1"))).unwrap();
        let prompt = router.selection_prompt("net income?");
        assert!(prompt.contains("(1) fin_stmt: Use this tool for accessing financial statements"));
        assert!(prompt.contains("(2) stock_prices: Use this tool for accessing stock prices"));
        assert!(prompt.contains("'net income?'"));
    }
}
