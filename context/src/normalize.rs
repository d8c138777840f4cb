//! Event normalization ahead of summarization.
//!
//! The summarizer writes in the agent's first person, so roles are relabeled
//! from the agent's point of view: its own replies become `you`, system output
//! becomes `your computer`, and user turns are dropped entirely.

use serde_json::Value;

use chronicle_types::{Message, Role};

use crate::payload::extract_structured_payload;

/// Key stripped from assistant payloads before summarization.
const THOUGHTS_KEY: &str = "thoughts";

/// Produce summarization-ready copies of `events`.
///
/// Order is preserved. Input messages are never modified.
#[must_use]
pub fn normalize_events(events: &[Message], debug_mode: bool) -> Vec<Message> {
    events
        .iter()
        .filter(|event| *event.role() != Role::User)
        .map(|event| normalize_event(event, debug_mode))
        .collect()
}

fn normalize_event(event: &Message, debug_mode: bool) -> Message {
    match event.role() {
        Role::Assistant => Message::new(Role::You, strip_thoughts(event.content(), debug_mode)),
        Role::System => Message::new(Role::YourComputer, event.content()),
        _ => event.clone(),
    }
}

fn strip_thoughts(content: &str, debug_mode: bool) -> String {
    let mut payload = match extract_structured_payload(content) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "Malformed assistant payload, summarizing it verbatim");
            if debug_mode {
                tracing::error!(content, "Malformed assistant payload content");
            }
            return content.to_string();
        }
    };

    payload.shift_remove(THOUGHTS_KEY);
    Value::Object(payload).to_string()
}
