//! History trimming.
//!
//! The active message chain is whatever the agent still sends to its main
//! model. Everything past the trim cursor that is no longer in that chain is
//! stale: it gets folded into the running summary and the cursor moves past it.

use std::collections::HashSet;

use chronicle_types::Message;

use crate::audit::AuditSink;
use crate::budget::TokenBudgeter;
use crate::completion::CompletionService;
use crate::history::MessageHistory;
use crate::summarization::{BatchSummarizer, SummaryError, SummarySettings};

/// Result of one [`HistoryTrimmer::trim`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trimmed {
    /// Framed running summary, ready to inject into the next prompt.
    pub summary_message: Message,
    /// Messages folded into the summary by this call, in history order.
    pub trimmed: Vec<Message>,
}

pub struct HistoryTrimmer<C, B, A> {
    summarizer: BatchSummarizer<C, B, A>,
}

impl<C, B, A> HistoryTrimmer<C, B, A>
where
    C: CompletionService,
    B: TokenBudgeter,
    A: AuditSink,
{
    pub fn new(completion: C, budgeter: B, audit: A, settings: SummarySettings) -> Self {
        Self::from_summarizer(BatchSummarizer::new(completion, budgeter, audit, settings))
    }

    pub fn from_summarizer(summarizer: BatchSummarizer<C, B, A>) -> Self {
        Self { summarizer }
    }

    #[must_use]
    pub fn summarizer(&self) -> &BatchSummarizer<C, B, A> {
        &self.summarizer
    }

    /// Fold messages that left `current_chain` into the summary.
    ///
    /// Candidates are the flattened messages strictly after the cursor;
    /// membership in the chain is by role and content. With nothing stale the
    /// history is left untouched and no completion call is made.
    ///
    /// On error, summaries from batches already sent are kept but the cursor
    /// does not move.
    pub async fn trim(
        &self,
        history: &mut MessageHistory,
        current_chain: &[Message],
    ) -> Result<Trimmed, SummaryError> {
        let cursor = history.last_trimmed_index();
        let (trimmed, last_index) = {
            let chain: HashSet<&Message> = current_chain.iter().collect();
            let mut stale = Vec::new();
            let mut last_index = None;
            for (index, message) in history.flatten().enumerate().skip(cursor.saturating_add(1)) {
                if !chain.contains(message) {
                    stale.push(message.clone());
                    last_index = Some(index);
                }
            }
            (stale, last_index)
        };

        let Some(last_index) = last_index else {
            tracing::debug!(cursor, "No stale messages to trim");
            return Ok(Trimmed {
                summary_message: history.summary_message(),
                trimmed: Vec::new(),
            });
        };

        let summary_message = self
            .summarizer
            .update_running_summary(history, &trimmed)
            .await?;
        history.advance_cursor(last_index);

        tracing::info!(
            trimmed = trimmed.len(),
            previous_cursor = cursor,
            cursor = history.last_trimmed_index(),
            "Trimmed history into running summary"
        );

        Ok(Trimmed {
            summary_message,
            trimmed,
        })
    }
}
