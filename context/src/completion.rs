//! Completion service seam between the summarizer and an LLM backend.

use std::future::Future;

use thiserror::Error;

use chronicle_providers::{ProviderClient, ProviderError};
use chronicle_types::Message;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("missing API key: {0}")]
    MissingApiKey(String),
}

impl From<ProviderError> for CompletionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingApiKey(_) => CompletionError::MissingApiKey(err.to_string()),
            ProviderError::Client(_) | ProviderError::Transport { .. } => {
                CompletionError::Transport(err.to_string())
            }
            ProviderError::Api { status, body, .. } => CompletionError::Api { status, body },
            ProviderError::MalformedResponse { .. } => {
                CompletionError::MalformedResponse(err.to_string())
            }
        }
    }
}

/// Sends a role-tagged message sequence to `model` and returns one reply.
pub trait CompletionService {
    fn complete(
        &self,
        messages: &[Message],
        model: &str,
    ) -> impl Future<Output = Result<Message, CompletionError>> + Send;
}

impl<T: CompletionService + ?Sized> CompletionService for &T {
    fn complete(
        &self,
        messages: &[Message],
        model: &str,
    ) -> impl Future<Output = Result<Message, CompletionError>> + Send {
        (**self).complete(messages, model)
    }
}

/// [`CompletionService`] backed by the HTTP provider clients.
#[derive(Debug, Clone)]
pub struct ProviderCompletion {
    client: ProviderClient,
}

impl ProviderCompletion {
    #[must_use]
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

impl CompletionService for ProviderCompletion {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
    ) -> Result<Message, CompletionError> {
        Ok(self.client.complete(messages, model).await?)
    }
}
