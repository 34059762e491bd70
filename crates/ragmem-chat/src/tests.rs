//! Snapshot tests for the chat session

#[cfg(test)]
mod session_tests {
    use crate::{ChatConfig, ConversationalRag, QueryPolicy, ui};
    use async_trait::async_trait;
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use ragmem_core::{QueryEngine, Response, Result};
    use std::sync::Arc;

    /// Answers with the length of the query it received
    struct LengthEngine;

    #[async_trait]
    impl QueryEngine for LengthEngine {
        async fn query(&self, query: &str) -> Result<Response> {
            Ok(Response::new(query.len().to_string()))
        }
    }

    #[tokio::test]
    async fn test_three_turn_session() {
        let session = ConversationalRag::new(
            Arc::new(LengthEngine),
            QueryPolicy::Template,
            ChatConfig::default(),
        );

        session.answer("What is the revenue?").await.unwrap();
        session.answer("How about last year?").await.unwrap();
        session.answer("And the margin?").await.unwrap();

        assert_yaml_snapshot!(session.history().await, @r###"
        - role: user
          content: What is the revenue?
        - role: assistant
          content: "20"
        - role: user
          content: How about last year?
        - role: assistant
          content: "63"
        - role: user
          content: And the margin?
        - role: assistant
          content: "101"
        "###);

        assert_snapshot!(ui::format_history(&session.history().await).trim_end(), @r###"
        [1] Q: What is the revenue?
            A: 20
        [2] Q: How about last year?
            A: 63
        [3] Q: And the margin?
            A: 101
        "###);
    }

    #[test]
    fn test_chat_config_serialization() {
        let config = ChatConfig::default().with_history_window(3);
        assert_yaml_snapshot!(config, @r###"
        history_window: 3
        call_timeout: ~
        "###);
    }
}
