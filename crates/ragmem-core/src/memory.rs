//! Conversation memory
//!
//! An append-only log of question/answer turns for one chat session. Every
//! user turn is immediately followed by the assistant turn that answered it,
//! so the log always holds as many questions as answers.

use crate::{Error, Result, Role, Turn};

/// Ordered log of prior turns, oldest first
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one question and the answer it received
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }

    /// Append a batch of turns.
    ///
    /// The batch must alternate user and assistant turns, starting with a user
    /// turn and ending with an assistant turn. A malformed batch is rejected
    /// as a whole and the log is left untouched.
    pub fn put_turns(&mut self, turns: Vec<Turn>) -> Result<()> {
        if turns.is_empty() {
            return Err(Error::Validation("no turns to append".to_string()));
        }

        for (i, turn) in turns.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            if turn.role() != expected {
                return Err(Error::Validation(format!(
                    "turn {} has role {:?}, expected {:?}",
                    i,
                    turn.role(),
                    expected
                )));
            }
        }

        if turns.len() % 2 != 0 {
            return Err(Error::Validation(
                "question has no matching answer".to_string(),
            ));
        }

        self.turns.extend(turns);
        Ok(())
    }

    /// Every turn recorded so far, in insertion order
    pub fn all_turns(&self) -> &[Turn] {
        &self.turns
    }

    /// (question, answer) pairs in insertion order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.turns
            .chunks_exact(2)
            .map(|pair| (pair[0].content(), pair[1].content()))
    }

    pub fn pair_count(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
