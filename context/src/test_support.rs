//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chronicle_types::Message;

use crate::audit::{AuditError, AuditLabel, AuditPayload, AuditSink, ConversationId};
use crate::budget::TokenBudgeter;
use crate::completion::{CompletionError, CompletionService};
use crate::summarization::{DEFAULT_FAST_MODEL, SummarySettings};

pub(crate) fn settings() -> SummarySettings {
    SummarySettings::new(
        DEFAULT_FAST_MODEL,
        ConversationId::with_created_at("test-agent", "20240101_000000"),
    )
}

/// One token per character; fixed context size for every model.
pub(crate) struct CharBudgeter {
    context: u32,
}

pub(crate) fn char_budgeter(context: u32) -> CharBudgeter {
    CharBudgeter { context }
}

impl TokenBudgeter for CharBudgeter {
    fn max_context_tokens(&self, _model: &str) -> u32 {
        self.context
    }

    fn token_length(&self, text: &str, _model: &str) -> u32 {
        u32::try_from(text.chars().count()).unwrap_or(u32::MAX)
    }
}

/// Replies from a script; `None` entries fail that call.
#[derive(Default)]
pub(crate) struct FakeCompletion {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<(Vec<Message>, String)>>,
}

impl FakeCompletion {
    pub(crate) fn replying<const N: usize>(replies: [&str; N]) -> Self {
        Self::scripted(replies.into_iter().map(Some).collect())
    }

    pub(crate) fn scripted(replies: Vec<Option<&str>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(messages, _)| messages.clone())
            .collect()
    }

    pub(crate) fn models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, model)| model.clone())
            .collect()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CompletionService for FakeCompletion {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
    ) -> Result<Message, CompletionError> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), model.to_string()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(reply)) => Ok(Message::assistant(reply)),
            Some(None) => Err(CompletionError::Api {
                status: 500,
                body: "scripted failure".to_string(),
            }),
            None => Err(CompletionError::Transport("no scripted reply left".to_string())),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingAuditSink {
    records: Mutex<Vec<(usize, AuditLabel)>>,
}

impl RecordingAuditSink {
    pub(crate) fn records(&self) -> Vec<(usize, AuditLabel)> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(
        &self,
        _conversation: &ConversationId,
        sequence_no: usize,
        payload: AuditPayload<'_>,
        label: AuditLabel,
    ) -> Result<(), AuditError> {
        payload.to_bytes()?;
        self.records.lock().unwrap().push((sequence_no, label));
        Ok(())
    }
}

pub(crate) struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn record(
        &self,
        _conversation: &ConversationId,
        _sequence_no: usize,
        _payload: AuditPayload<'_>,
        _label: AuditLabel,
    ) -> Result<(), AuditError> {
        Err(AuditError::Io {
            path: "/dev/null/audit".into(),
            source: std::io::Error::other("disk full"),
        })
    }
}
