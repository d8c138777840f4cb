//! Running-summary maintenance.
//!
//! [`BatchSummarizer`] folds new events into the summary held by a
//! [`MessageHistory`]. Events are normalized, packed greedily into batches that
//! fit the fast model's context next to the current summary, and each batch is
//! sent as one completion call whose reply replaces the summary.
//!
//! Batches are flushed strictly in order. If a call fails, summaries produced
//! by earlier batches stay in the history and the error is returned.


use thiserror::Error;

use chronicle_types::Message;

use crate::audit::{AuditLabel, AuditPayload, AuditSink, ConversationId};
use crate::budget::TokenBudgeter;
use crate::completion::{CompletionError, CompletionService};
use crate::history::MessageHistory;
use crate::normalize::normalize_events;

/// Model used for summaries unless configured otherwise.
pub const DEFAULT_FAST_MODEL: &str = "gpt-3.5-turbo";
/// Tokens reserved for the fixed prompt text around summary and events.
pub const DEFAULT_PROMPT_TEMPLATE_OVERHEAD: u32 = 100;

const NOTHING_NEW: &str = "Nothing new happened.";
const TRUNCATION_MARKER: &str = "[truncated]";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(
        "summary takes {summary_tokens} tokens of a {context_window}-token context, \
         leaving no room for events"
    )]
    BudgetExhausted {
        summary_tokens: u32,
        context_window: u32,
    },
}

/// Knobs for one conversation's summarizer.
#[derive(Debug, Clone)]
pub struct SummarySettings {
    /// Fast model the summary prompt is sent to.
    pub model: String,
    pub prompt_template_overhead: u32,
    /// Log raw content of malformed assistant payloads.
    pub debug_mode: bool,
    /// Audit trail identity.
    pub conversation: ConversationId,
}

impl SummarySettings {
    #[must_use]
    pub fn new(model: impl Into<String>, conversation: ConversationId) -> Self {
        Self {
            model: model.into(),
            prompt_template_overhead: DEFAULT_PROMPT_TEMPLATE_OVERHEAD,
            debug_mode: false,
            conversation,
        }
    }
}

/// Build the summarization prompt for `summary` and already-normalized `events`.
#[must_use]
pub fn build_summary_prompt(summary: &str, events: &[Message]) -> String {
    let development = if events.is_empty() {
        NOTHING_NEW.to_string()
    } else {
        events
            .iter()
            .map(|event| render_event(event.role().as_str(), event.content()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Your task is to create a concise running summary of actions and information results \
         in the provided text, focusing on key and potentially important information to \
         remember.\n\n\
         You will receive the current summary and your latest actions. Combine them, adding \
         relevant key information from the latest development in 1st person past tense and \
         keeping the summary concise.\n\n\
         Summary So Far:\n\"\"\"\n{summary}\n\"\"\"\n\n\
         Latest Development:\n\"\"\"\n{development}\n\"\"\"\n"
    )
}

/// One event as a single JSON line: `{"role":..,"content":..}`.
#[must_use]
pub fn render_event(role: &str, content: &str) -> String {
    use serde_json::Value;

    format!(
        "{{\"role\":{},\"content\":{}}}",
        Value::from(role),
        Value::from(content)
    )
}

pub struct BatchSummarizer<C, B, A> {
    completion: C,
    budgeter: B,
    audit: A,
    settings: SummarySettings,
}

impl<C, B, A> BatchSummarizer<C, B, A>
where
    C: CompletionService,
    B: TokenBudgeter,
    A: AuditSink,
{
    pub fn new(completion: C, budgeter: B, audit: A, settings: SummarySettings) -> Self {
        Self {
            completion,
            budgeter,
            audit,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SummarySettings {
        &self.settings
    }

    /// Fold `new_events` into the history's summary and return the framed summary.
    ///
    /// Empty input makes no completion call.
    pub async fn update_running_summary(
        &self,
        history: &mut MessageHistory,
        new_events: &[Message],
    ) -> Result<Message, SummaryError> {
        if new_events.is_empty() {
            return Ok(history.summary_message());
        }

        let events = normalize_events(new_events, self.settings.debug_mode);
        let mut budget = self.batch_budget(history);
        let mut batch: Vec<Message> = Vec::new();
        let mut batch_tokens: u32 = 0;

        for event in events {
            let mut tokens = self.event_tokens(event.role().as_str(), event.content());

            if !batch.is_empty() && batch_tokens.saturating_add(tokens) > budget {
                self.flush(history, &batch, batch_tokens, budget).await?;
                batch.clear();
                batch_tokens = 0;
                budget = self.batch_budget(history);
            }

            let event = if tokens > budget {
                let truncated = self.truncate_to_fit(event, budget, history)?;
                tokens = self.event_tokens(truncated.role().as_str(), truncated.content());
                truncated
            } else {
                event
            };

            batch_tokens = batch_tokens.saturating_add(tokens);
            batch.push(event);
        }

        if !batch.is_empty() {
            self.flush(history, &batch, batch_tokens, budget).await?;
        }

        Ok(history.summary_message())
    }

    /// Send one batch of normalized events and replace the summary with the reply.
    pub async fn summarize_batch(
        &self,
        history: &mut MessageHistory,
        events: &[Message],
    ) -> Result<(), SummaryError> {
        let prompt = vec![Message::user(build_summary_prompt(history.summary(), events))];
        let sequence_no = history.len();

        self.audit(sequence_no, AuditPayload::Messages(&prompt), AuditLabel::SummaryPrompt);

        let reply = self
            .completion
            .complete(&prompt, &self.settings.model)
            .await?;
        let (_, summary) = reply.into_parts();
        history.replace_summary(summary);

        self.audit(sequence_no, AuditPayload::Text(history.summary()), AuditLabel::Summary);
        Ok(())
    }

    async fn flush(
        &self,
        history: &mut MessageHistory,
        batch: &[Message],
        batch_tokens: u32,
        budget: u32,
    ) -> Result<(), SummaryError> {
        tracing::debug!(
            events = batch.len(),
            batch_tokens,
            budget,
            model = %self.settings.model,
            "Flushing summary batch"
        );
        self.summarize_batch(history, batch).await
    }

    fn batch_budget(&self, history: &MessageHistory) -> u32 {
        let model = &self.settings.model;
        self.budgeter
            .max_context_tokens(model)
            .saturating_sub(self.settings.prompt_template_overhead)
            .saturating_sub(self.budgeter.token_length(history.summary(), model))
    }

    fn event_tokens(&self, role: &str, content: &str) -> u32 {
        self.budgeter
            .token_length(&render_event(role, content), &self.settings.model)
    }

    /// Cut an event that alone exceeds `budget` down to the longest prefix that fits.
    fn truncate_to_fit(
        &self,
        event: Message,
        budget: u32,
        history: &MessageHistory,
    ) -> Result<Message, SummaryError> {
        let (role, content) = event.into_parts();
        let role_str = role.as_str();

        if self.event_tokens(role_str, "") > budget {
            let model = &self.settings.model;
            return Err(SummaryError::BudgetExhausted {
                summary_tokens: self.budgeter.token_length(history.summary(), model),
                context_window: self.budgeter.max_context_tokens(model),
            });
        }

        let with_marker = |end: usize| format!("{}{TRUNCATION_MARKER}", &content[..end]);
        let fits = |end: usize| self.event_tokens(role_str, &with_marker(end)) <= budget;

        let boundaries: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();

        // Largest boundary whose prefix plus marker still fits.
        let (mut lo, mut hi) = (0usize, boundaries.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if fits(boundaries[mid]) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        let truncated = match lo.checked_sub(1) {
            Some(index) => with_marker(boundaries[index]),
            None => String::new(),
        };

        tracing::warn!(
            role = role_str,
            original_bytes = content.len(),
            kept_bytes = truncated.len(),
            budget,
            "Event exceeds summary batch budget, truncating"
        );

        Ok(Message::new(role, truncated))
    }

    fn audit(&self, sequence_no: usize, payload: AuditPayload<'_>, label: AuditLabel) {
        if let Err(err) = self
            .audit
            .record(&self.settings.conversation, sequence_no, payload, label)
        {
            tracing::warn!(
                error = %err,
                file = label.file_name(),
                "Failed to record summary audit entry"
            );
        }
    }
}
