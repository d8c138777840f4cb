//! Message history store.
//!
//! [`MessageHistory`] owns the append-only log of [`MessageCycle`]s, the
//! running summary standing in for trimmed history, and the cursor marking the
//! last message folded into that summary.
//!
//! The cursor indexes the *flattened* message sequence: every cycle's messages
//! in cycle order. It never moves backwards and never points past the end.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use chronicle_types::{EmptyCycleError, Message, MessageCycle};

/// Summary a fresh history starts from.
pub const INITIAL_SUMMARY: &str = "I was created";

const SUMMARY_PREAMBLE: &str = "This reminds you of these events from your past: \n";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("last_trimmed_index {cursor} is past the end of {len} messages")]
    CursorOutOfRange { cursor: usize, len: usize },
    #[error(transparent)]
    EmptyCycle(#[from] EmptyCycleError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageHistorySerde")]
pub struct MessageHistory {
    cycles: Vec<MessageCycle>,
    summary: String,
    last_trimmed_index: usize,
}

#[derive(Deserialize)]
struct MessageHistorySerde {
    #[serde(default)]
    cycles: Vec<MessageCycle>,
    #[serde(default = "initial_summary")]
    summary: String,
    #[serde(default)]
    last_trimmed_index: usize,
}

fn initial_summary() -> String {
    INITIAL_SUMMARY.to_string()
}

impl TryFrom<MessageHistorySerde> for MessageHistory {
    type Error = HistoryError;

    fn try_from(raw: MessageHistorySerde) -> Result<Self, Self::Error> {
        let history = MessageHistory {
            cycles: raw.cycles,
            summary: raw.summary,
            last_trimmed_index: raw.last_trimmed_index,
        };
        let len = history.message_count();
        if history.last_trimmed_index > len {
            return Err(HistoryError::CursorOutOfRange {
                cursor: history.last_trimmed_index,
                len,
            });
        }
        Ok(history)
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::with_summary(INITIAL_SUMMARY)
    }

    #[must_use]
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            cycles: Vec::new(),
            summary: summary.into(),
            last_trimmed_index: 0,
        }
    }

    pub fn append(&mut self, cycle: MessageCycle) {
        self.cycles.push(cycle);
    }

    /// Append a cycle built from raw messages.
    pub fn append_messages(&mut self, messages: Vec<Message>) -> Result<(), HistoryError> {
        self.append(MessageCycle::new(messages)?);
        Ok(())
    }

    /// Every stored message, cycle by cycle.
    pub fn flatten(&self) -> impl Iterator<Item = &Message> + '_ {
        self.cycles.iter().flat_map(MessageCycle::messages)
    }

    /// Number of cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Number of messages in the flattened sequence.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.cycles.iter().map(MessageCycle::len).sum()
    }

    #[must_use]
    pub fn cycles(&self) -> &[MessageCycle] {
        &self.cycles
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[must_use]
    pub fn last_trimmed_index(&self) -> usize {
        self.last_trimmed_index
    }

    /// The running summary framed as a system message for the next prompt.
    #[must_use]
    pub fn summary_message(&self) -> Message {
        Message::system(format!("{SUMMARY_PREAMBLE}{}", self.summary))
    }

    pub(crate) fn replace_summary(&mut self, summary: String) {
        self.summary = summary;
    }

    /// Move the cursor forward to `index`. Backward or out-of-range moves are ignored.
    pub(crate) fn advance_cursor(&mut self, index: usize) {
        let len = self.message_count();
        if index < self.last_trimmed_index || index > len {
            tracing::warn!(
                current = self.last_trimmed_index,
                requested = index,
                len,
                "Refusing to move trim cursor"
            );
            return;
        }
        self.last_trimmed_index = index;
    }
}
