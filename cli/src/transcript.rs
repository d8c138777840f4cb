//! Transcript files on disk.
//!
//! A transcript is either a persisted [`MessageHistory`] (cycles, summary and
//! cursor) or a bare JSON array of cycles as an agent logs them. A bare log is
//! promoted to a fresh history starting from the configured initial summary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use chronicle_context::{MessageHistory, atomic_write};
use chronicle_types::{Message, MessageCycle};

pub fn load(path: &Path, initial_summary: &str) -> Result<MessageHistory> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse transcript {}", path.display()))?;

    // Shape decides the type, so history validation errors surface unchanged.
    if value.is_array() {
        let cycles: Vec<MessageCycle> = serde_json::from_value(value)
            .with_context(|| format!("invalid cycle log {}", path.display()))?;
        let mut history = MessageHistory::with_summary(initial_summary);
        for cycle in cycles {
            history.append(cycle);
        }
        Ok(history)
    } else {
        serde_json::from_value(value)
            .with_context(|| format!("invalid transcript {}", path.display()))
    }
}

pub fn save(path: &Path, history: &MessageHistory) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(history).context("failed to serialize transcript")?;
    atomic_write(path, &bytes)
        .with_context(|| format!("failed to write transcript {}", path.display()))
}

pub fn load_chain(path: &Path) -> Result<Vec<Message>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read chain {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse chain {}", path.display()))
}

/// The last `keep` flattened messages, as an agent would still be sending them.
pub fn tail_chain(history: &MessageHistory, keep: usize) -> Vec<Message> {
    let total = history.message_count();
    history
        .flatten()
        .skip(total.saturating_sub(keep))
        .cloned()
        .collect()
}
