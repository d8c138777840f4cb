//! Core message domain model.
//!
//! A `Message` is a plain role + content value. Two messages with the same
//! role and content are the same message as far as history bookkeeping is
//! concerned, so equality and hashing are derived on both fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn into_parts(self) -> (Role, String) {
        (self.role, self.content)
    }
}

#[derive(Debug, Error)]
#[error("a message cycle must contain at least one message")]
pub struct EmptyCycleError;

/// One request/response round of the agent loop.
///
/// Always holds at least one message; the order of messages inside the cycle
/// is the order they were exchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct MessageCycle {
    messages: Vec<Message>,
}

impl MessageCycle {
    pub fn new(messages: Vec<Message>) -> Result<Self, EmptyCycleError> {
        if messages.is_empty() {
            Err(EmptyCycleError)
        } else {
            Ok(Self { messages })
        }
    }

    /// The usual shape of an agent round: the prompt we sent, the model's
    /// reply, and optionally what executing that reply produced.
    #[must_use]
    pub fn exchange(
        user_input: impl Into<String>,
        assistant_reply: impl Into<String>,
        result: Option<String>,
    ) -> Self {
        let mut messages = vec![
            Message::user(user_input),
            Message::assistant(assistant_reply),
        ];
        if let Some(result) = result {
            messages.push(Message::system(result));
        }
        Self { messages }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl TryFrom<Vec<Message>> for MessageCycle {
    type Error = EmptyCycleError;

    fn try_from(messages: Vec<Message>) -> Result<Self, Self::Error> {
        Self::new(messages)
    }
}

impl From<Message> for MessageCycle {
    fn from(message: Message) -> Self {
        Self {
            messages: vec![message],
        }
    }
}

impl From<MessageCycle> for Vec<Message> {
    fn from(cycle: MessageCycle) -> Self {
        cycle.messages
    }
}

impl<'a> IntoIterator for &'a MessageCycle {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
