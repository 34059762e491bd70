//! Conversational RAG loop
//!
//! Each question is merged with the conversation so far according to the
//! session's [`QueryPolicy`], answered by the query engine, and then recorded
//! in the conversation memory together with its answer.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use ragmem_core::{
    Collaborator, ConversationMemory, Error, QueryEngine, Response, Result, Turn,
};

use crate::policy::{ChatConfig, QueryPolicy, rewrite_messages, template_query};

/// A chat session over a query engine, with memory of earlier turns
pub struct ConversationalRag {
    engine: Arc<dyn QueryEngine>,
    policy: QueryPolicy,
    config: ChatConfig,
    memory: Mutex<ConversationMemory>,
}

impl ConversationalRag {
    /// Start a session with empty memory. The policy is fixed for the
    /// lifetime of the session.
    pub fn new(engine: Arc<dyn QueryEngine>, policy: QueryPolicy, config: ChatConfig) -> Self {
        Self {
            engine,
            policy,
            config,
            memory: Mutex::new(ConversationMemory::new()),
        }
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Answer a question and record it in the conversation
    pub async fn answer(&self, query: &str) -> Result<String> {
        Ok(self.answer_with_sources(query).await?.into_text())
    }

    /// Like [`answer`](Self::answer), but also returns the retrieved sources
    pub async fn answer_with_sources(&self, query: &str) -> Result<Response> {
        // Held until the turn is recorded so concurrent callers cannot interleave.
        let mut memory = self.memory.lock().await;

        let effective = self.build_effective_query(&memory, query).await?;
        debug!(query, effective_query = %effective, "executing query");

        let response = self
            .call(Collaborator::VectorIndex, self.engine.query(&effective))
            .await?;

        memory.append(query, response.text.clone());
        Ok(response)
    }

    /// The text that would be sent for retrieval if `query` were asked now
    pub async fn effective_query(&self, query: &str) -> Result<String> {
        let memory = self.memory.lock().await;
        self.build_effective_query(&memory, query).await
    }

    /// Snapshot of the conversation so far
    pub async fn history(&self) -> Vec<Turn> {
        self.memory.lock().await.all_turns().to_vec()
    }

    async fn build_effective_query(&self, memory: &ConversationMemory, query: &str) -> Result<String> {
        let window = self
            .config
            .history_window
            .unwrap_or(usize::MAX)
            .min(memory.pair_count());
        if window == 0 {
            return Ok(query.to_string());
        }
        let skip = memory.pair_count() - window;

        match &self.policy {
            QueryPolicy::Template => Ok(template_query(memory.pairs().skip(skip), query)),
            QueryPolicy::Rewrite(chat_model) => {
                let history = &memory.all_turns()[skip * 2..];
                let messages = rewrite_messages(history, query);
                let rewritten = self
                    .call(Collaborator::ChatModel, chat_model.complete(&messages))
                    .await?;

                let rewritten = rewritten.trim();
                if rewritten.is_empty() {
                    warn!(query, "rewrite returned nothing, using the raw query");
                    return Ok(query.to_string());
                }
                Ok(rewritten.to_string())
            }
        }
    }

    /// Run one collaborator call under the session timeout, tagging failures
    /// with the collaborator that produced them
    async fn call<T>(
        &self,
        collaborator: Collaborator,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let outcome = match self.config.call_timeout {
            Some(limit) => match timeout(limit, future).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::Timeout(format!(
                    "{} did not answer within {:?}",
                    collaborator, limit
                ))),
            },
            None => future.await,
        };

        outcome.map_err(|e| Error::unavailable(collaborator, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragmem_core::{ChatMessage, ChatModel, Role};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Records what it receives and answers from a script
    #[derive(Default)]
    struct ScriptedEngine {
        received: StdMutex<Vec<String>>,
        answers: StdMutex<VecDeque<Result<String>>>,
    }

    impl ScriptedEngine {
        fn with_answers(answers: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                received: StdMutex::new(Vec::new()),
                answers: StdMutex::new(answers.iter().map(|a| Ok(a.to_string())).collect()),
            })
        }

        fn received(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryEngine for ScriptedEngine {
        async fn query(&self, query: &str) -> Result<Response> {
            self.received.lock().unwrap().push(query.to_string());
            let next = self.answers.lock().unwrap().pop_front();
            match next {
                Some(answer) => answer.map(Response::new),
                None => Ok(Response::new(format!("echo: {}", query))),
            }
        }
    }

    struct RewritingModel(&'static str);

    #[async_trait]
    impl ChatModel for RewritingModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_id(&self) -> &str {
            "rewriter"
        }
    }

    struct StalledEngine;

    #[async_trait]
    impl QueryEngine for StalledEngine {
        async fn query(&self, _query: &str) -> Result<Response> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Response::new("too late"))
        }
    }

    fn template_session(engine: Arc<ScriptedEngine>) -> ConversationalRag {
        ConversationalRag::new(engine, QueryPolicy::Template, ChatConfig::default())
    }

    #[tokio::test]
    async fn test_first_query_is_sent_unchanged() {
        let engine = ScriptedEngine::with_answers(&[]);
        let session = template_session(engine.clone());

        session.answer("What is the revenue?").await.unwrap();
        assert_eq!(engine.received(), vec!["What is the revenue?"]);
    }

    #[tokio::test]
    async fn test_revenue_scenario() {
        let engine = ScriptedEngine::with_answers(&["100", "90"]);
        let session = template_session(engine.clone());

        assert_eq!(session.answer("What is the revenue?").await.unwrap(), "100");
        assert_eq!(
            session.history().await,
            vec![Turn::user("What is the revenue?"), Turn::assistant("100")]
        );

        assert_eq!(session.answer("How about last year?").await.unwrap(), "90");
        assert_eq!(
            engine.received()[1],
            "Question: What is the revenue?, Answer: 100\nHow about last year?"
        );

        let history = session.history().await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], Turn::user("How about last year?"));
        assert_eq!(history[3], Turn::assistant("90"));
    }

    #[tokio::test]
    async fn test_history_alternates_after_n_answers() {
        let engine = ScriptedEngine::with_answers(&[]);
        let session = template_session(engine);

        for i in 0..5 {
            session.answer(&format!("question {}", i)).await.unwrap();
        }

        let history = session.history().await;
        assert_eq!(history.len(), 10);
        for (i, turn) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role(), expected);
        }
    }

    #[tokio::test]
    async fn test_empty_query_passes_through() {
        let engine = ScriptedEngine::with_answers(&["nothing"]);
        let session = template_session(engine.clone());

        session.answer("").await.unwrap();
        assert_eq!(engine.received(), vec![""]);
        assert_eq!(session.history().await[0], Turn::user(""));
    }

    #[tokio::test]
    async fn test_history_window_limits_merged_pairs() {
        let engine = ScriptedEngine::with_answers(&["a1", "a2", "a3"]);
        let session = ConversationalRag::new(
            engine.clone(),
            QueryPolicy::Template,
            ChatConfig::default().with_history_window(1),
        );

        session.answer("q1").await.unwrap();
        session.answer("q2").await.unwrap();
        session.answer("q3").await.unwrap();

        assert_eq!(engine.received()[2], "Question: q2, Answer: a2\nq3");
        assert_eq!(session.history().await.len(), 6);
    }

    #[tokio::test]
    async fn test_zero_history_window_sends_raw_query_for_both_policies() {
        let policies = [
            QueryPolicy::Template,
            QueryPolicy::Rewrite(Arc::new(RewritingModel("REWRITTEN"))),
        ];

        for policy in policies {
            let engine = ScriptedEngine::with_answers(&["a1", "a2"]);
            let session = ConversationalRag::new(
                engine.clone(),
                policy,
                ChatConfig::default().with_history_window(0),
            );

            session.answer("q1").await.unwrap();
            session.answer("q2").await.unwrap();

            assert_eq!(engine.received(), vec!["q1", "q2"]);
            assert_eq!(session.history().await.len(), 4);
        }
    }

    #[tokio::test]
    async fn test_rewrite_policy_uses_model_output() {
        let engine = ScriptedEngine::with_answers(&["100", "90"]);
        let session = ConversationalRag::new(
            engine.clone(),
            QueryPolicy::Rewrite(Arc::new(RewritingModel("What was the revenue last year?"))),
            ChatConfig::default(),
        );

        session.answer("What is the revenue?").await.unwrap();
        session.answer("How about last year?").await.unwrap();

        let received = engine.received();
        assert_eq!(received[0], "What is the revenue?");
        assert_eq!(received[1], "What was the revenue last year?");
        // The raw question is what gets remembered.
        assert_eq!(session.history().await[2], Turn::user("How about last year?"));
    }

    #[tokio::test]
    async fn test_empty_rewrite_falls_back_to_raw_query() {
        let engine = ScriptedEngine::with_answers(&["100", "90"]);
        let session = ConversationalRag::new(
            engine.clone(),
            QueryPolicy::Rewrite(Arc::new(RewritingModel("   "))),
            ChatConfig::default(),
        );

        session.answer("q1").await.unwrap();
        session.answer("q2").await.unwrap();
        assert_eq!(engine.received()[1], "q2");
    }

    #[tokio::test]
    async fn test_engine_failure_is_surfaced_and_not_recorded() {
        let engine = Arc::new(ScriptedEngine {
            received: StdMutex::new(Vec::new()),
            answers: StdMutex::new(VecDeque::from(vec![Err(Error::Network(
                "connection refused".to_string(),
            ))])),
        });
        let session = template_session(engine);

        let err = session.answer("What is the revenue?").await.unwrap_err();
        match err {
            Error::CollaboratorUnavailable { collaborator, source } => {
                assert_eq!(collaborator, Collaborator::VectorIndex);
                assert!(matches!(*source, Error::Network(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let session = ConversationalRag::new(
            Arc::new(StalledEngine),
            QueryPolicy::Template,
            ChatConfig::default().with_call_timeout(Duration::from_millis(50)),
        );

        let err = session.answer("slow?").await.unwrap_err();
        match err {
            Error::CollaboratorUnavailable { source, .. } => {
                assert!(matches!(*source, Error::Timeout(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_effective_query_does_not_record() {
        let engine = ScriptedEngine::with_answers(&["100"]);
        let session = template_session(engine.clone());

        assert_eq!(session.effective_query("q").await.unwrap(), "q");
        session.answer("What is the revenue?").await.unwrap();

        let first = session.effective_query("How about last year?").await.unwrap();
        let second = session.effective_query("How about last year?").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(session.history().await.len(), 2);
        assert_eq!(engine.received().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_answers_keep_pairs_together() {
        let engine = ScriptedEngine::with_answers(&[]);
        let session = Arc::new(template_session(engine));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move { session.answer(&format!("q{}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = session.history().await;
        assert_eq!(history.len(), 16);
        for pair in history.chunks(2) {
            assert!(pair[0].is_user() && pair[1].is_assistant());
            let question = pair[0].content();
            assert!(pair[1].content().ends_with(question));
        }
    }
}
