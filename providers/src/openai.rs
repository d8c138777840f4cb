//! OpenAI Chat Completions client (non-streaming).
//!
//! Request: `POST {base}/chat/completions` with `{ model, messages: [{ role, content }] }`.
//! Response: `{ choices: [{ message: { role, content } }] }`.
//!
//! Any server speaking the same shape (local inference servers, proxies) works by
//! pointing `openai_base_url` at it.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use chronicle_types::Message;

use crate::retry::{RetryConfig, send_with_retry};
use crate::{Provider, ProviderError, api_role, into_success};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub(crate) fn build_request_body(model: &str, messages: &[Message]) -> Value {
    let messages: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "role": api_role(m.role()), "content": m.content() }))
        .collect();

    json!({
        "model": model,
        "messages": messages,
        "stream": false,
    })
}

pub(crate) fn parse_response(body: Value) -> Result<String, ProviderError> {
    let parsed: ChatResponse =
        serde_json::from_value(body).map_err(|e| ProviderError::MalformedResponse {
            provider: Provider::OpenAI,
            detail: e.to_string(),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::MalformedResponse {
            provider: Provider::OpenAI,
            detail: "response has no message content".to_string(),
        })
}

pub(crate) async fn complete(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[Message],
    retry: &RetryConfig,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let body = build_request_body(model, messages);

    let outcome = send_with_retry(
        || {
            client
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .header("content-type", "application/json")
                .json(&body)
        },
        timeout,
        retry,
    )
    .await;

    let response = into_success(Provider::OpenAI, outcome).await?;
    let json: Value = response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse {
            provider: Provider::OpenAI,
            detail: e.to_string(),
        })?;

    parse_response(json)
}
