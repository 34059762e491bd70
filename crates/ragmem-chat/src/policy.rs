//! How prior turns are merged into a new question

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ragmem_core::{ChatMessage, ChatModel, Turn};

const REWRITE_INSTRUCTIONS: &str = "You rewrite follow-up questions. Given the conversation so \
far and a new question, produce a single standalone question that can be understood without \
the conversation. Reply with the question only.";

/// Strategy for building the effective query from the conversation so far
#[derive(Clone)]
pub enum QueryPolicy {
    /// Prepend every prior question and answer in a fixed textual format
    Template,
    /// Ask a chat model to rewrite the question into a standalone one
    Rewrite(Arc<dyn ChatModel>),
}

impl QueryPolicy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            QueryPolicy::Template => PolicyKind::Template,
            QueryPolicy::Rewrite(_) => PolicyKind::Rewrite,
        }
    }
}

impl fmt::Debug for QueryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPolicy::Template => write!(f, "Template"),
            QueryPolicy::Rewrite(model) => write!(f, "Rewrite({})", model.model_id()),
        }
    }
}

/// Policy name, for configuration and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Template,
    Rewrite,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Template => write!(f, "template"),
            PolicyKind::Rewrite => write!(f, "rewrite"),
        }
    }
}

/// Session settings for a conversational loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Most recent question/answer pairs merged into the effective query;
    /// all of them when unset. The stored history is never trimmed.
    pub history_window: Option<usize>,
    /// Upper bound on each call to the query engine or chat model
    pub call_timeout: Option<Duration>,
}

impl ChatConfig {
    pub fn with_history_window(mut self, pairs: usize) -> Self {
        self.history_window = Some(pairs);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

/// Build the template-policy query: one line per prior pair, then the question
pub fn template_query<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>, query: &str) -> String {
    let mut effective = String::new();
    for (question, answer) in pairs {
        effective.push_str(&format!("Question: {}, Answer: {}\n", question, answer));
    }
    effective.push_str(query);
    effective
}

/// Messages asking a chat model to make `query` standalone
pub fn rewrite_messages(history: &[Turn], query: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(REWRITE_INSTRUCTIONS));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(format!(
        "Rewrite this follow-up question as a standalone question: {}",
        query
    )));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragmem_core::Role;

    #[test]
    fn test_template_query_format() {
        let effective = template_query([("What is the revenue?", "100")], "How about last year?");
        assert_eq!(effective, "Question: What is the revenue?, Answer: 100\nHow about last year?");
    }

    #[test]
    fn test_template_query_without_history_is_raw() {
        let effective = template_query(std::iter::empty(), "What is the revenue?");
        assert_eq!(effective, "What is the revenue?");
    }

    #[test]
    fn test_template_query_is_deterministic() {
        let pairs = [("q1", "a1"), ("q2", "a2")];
        assert_eq!(template_query(pairs, "q3"), template_query(pairs, "q3"));
        assert_eq!(
            template_query(pairs, "q3"),
            "Question: q1, Answer: a1\nQuestion: q2, Answer: a2\nq3"
        );
    }

    #[test]
    fn test_rewrite_messages_layout() {
        let history = vec![Turn::user("What is the revenue?"), Turn::assistant("100")];
        let messages = rewrite_messages(&history, "How about last year?");

        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert!(messages[3].content.ends_with("How about last year?"));
    }

    #[test]
    fn test_policy_kind_display() {
        assert_eq!(QueryPolicy::Template.kind().to_string(), "template");
        assert_eq!(PolicyKind::Rewrite.to_string(), "rewrite");
    }
}
