//! Audit trail of summarization prompts and results.
//!
//! Each batch flush records two entries: the prompt sent to the model and the
//! summary it returned. Recording is best-effort; callers log failures and
//! carry on.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use chronicle_types::Message;

use crate::atomic_write::atomic_write;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to write audit record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize audit payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Identifies one agent conversation in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationId {
    agent_name: String,
    created_at: String,
}

impl ConversationId {
    /// Stamp a new conversation with the current local time.
    #[must_use]
    pub fn new(agent_name: impl Into<String>) -> Self {
        let created_at = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::with_created_at(agent_name, created_at)
    }

    #[must_use]
    pub fn with_created_at(agent_name: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            created_at: created_at.into(),
        }
    }

    #[must_use]
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    #[must_use]
    pub fn created_at(&self) -> &str {
        &self.created_at
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.agent_name, self.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLabel {
    SummaryPrompt,
    Summary,
}

impl AuditLabel {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            AuditLabel::SummaryPrompt => "prompt_summary.json",
            AuditLabel::Summary => "summary.txt",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AuditPayload<'a> {
    Messages(&'a [Message]),
    Text(&'a str),
}

impl AuditPayload<'_> {
    /// Bytes as written to disk: messages as pretty JSON, text verbatim.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AuditError> {
        match self {
            AuditPayload::Messages(messages) => Ok(serde_json::to_vec_pretty(messages)?),
            AuditPayload::Text(text) => Ok(text.as_bytes().to_vec()),
        }
    }
}

pub trait AuditSink {
    fn record(
        &self,
        conversation: &ConversationId,
        sequence_no: usize,
        payload: AuditPayload<'_>,
        label: AuditLabel,
    ) -> Result<(), AuditError>;
}

impl<T: AuditSink + ?Sized> AuditSink for &T {
    fn record(
        &self,
        conversation: &ConversationId,
        sequence_no: usize,
        payload: AuditPayload<'_>,
        label: AuditLabel,
    ) -> Result<(), AuditError> {
        (**self).record(conversation, sequence_no, payload, label)
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(
        &self,
        _conversation: &ConversationId,
        _sequence_no: usize,
        _payload: AuditPayload<'_>,
        _label: AuditLabel,
    ) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Emits each record as a debug-level tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(
        &self,
        conversation: &ConversationId,
        sequence_no: usize,
        payload: AuditPayload<'_>,
        label: AuditLabel,
    ) -> Result<(), AuditError> {
        let bytes = payload.to_bytes()?;
        tracing::debug!(
            %conversation,
            sequence_no,
            file = label.file_name(),
            payload = %String::from_utf8_lossy(&bytes),
            "Audit record"
        );
        Ok(())
    }
}

/// Writes records to `<root>/<agent>_<created_at>/<sequence_no>/<file>`.
#[derive(Debug, Clone)]
pub struct FileAuditSink {
    root: PathBuf,
}

impl FileAuditSink {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn record_path(
        &self,
        conversation: &ConversationId,
        sequence_no: usize,
        label: AuditLabel,
    ) -> PathBuf {
        self.root
            .join(conversation.to_string())
            .join(sequence_no.to_string())
            .join(label.file_name())
    }
}

impl AuditSink for FileAuditSink {
    fn record(
        &self,
        conversation: &ConversationId,
        sequence_no: usize,
        payload: AuditPayload<'_>,
        label: AuditLabel,
    ) -> Result<(), AuditError> {
        let bytes = payload.to_bytes()?;
        let path = self.record_path(conversation, sequence_no, label);
        let io_err = |source| AuditError::Io {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        atomic_write(&path, &bytes).map_err(io_err)
    }
}
