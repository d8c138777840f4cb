//! Anthropic Messages API client (non-streaming).
//!
//! System-role messages are lifted into the top-level `system` field; the rest
//! are sent in order. The reply text is the concatenation of all `text` blocks.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use chronicle_types::Message;

use crate::retry::{RetryConfig, send_with_retry};
use crate::{Provider, ProviderError, api_role, into_success};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub(crate) fn build_request_body(model: &str, messages: &[Message]) -> Value {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut turns: Vec<Value> = Vec::new();

    for message in messages {
        match api_role(message.role()) {
            "system" => system_parts.push(message.content()),
            role => turns.push(json!({ "role": role, "content": message.content() })),
        }
    }

    let mut body = json!({
        "model": model,
        "max_tokens": DEFAULT_MAX_TOKENS,
        "stream": false,
        "messages": turns,
    });
    if !system_parts.is_empty() {
        body["system"] = Value::String(system_parts.join("\n\n"));
    }
    body
}

pub(crate) fn parse_response(body: Value) -> Result<String, ProviderError> {
    let parsed: MessagesResponse =
        serde_json::from_value(body).map_err(|e| ProviderError::MalformedResponse {
            provider: Provider::Claude,
            detail: e.to_string(),
        })?;

    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(ProviderError::MalformedResponse {
            provider: Provider::Claude,
            detail: "response has no text content".to_string(),
        });
    }
    Ok(text)
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
    let url = format!("{}/messages", base_url.trim_end_matches('/'));
    let body = build_request_body(model, messages);

    let outcome = send_with_retry(
        || {
            client
                .post(&url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
        },
        timeout,
        retry,
    )
    .await;

    let response = into_success(Provider::Claude, outcome).await?;
    let json: Value = response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse {
            provider: Provider::Claude,
            detail: e.to_string(),
        })?;

    parse_response(json)
}
