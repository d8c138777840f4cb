//! Shared test utilities and fixtures
//!
//! Mock provider endpoints and settings pointing at them.

#![allow(dead_code)]

use std::time::Duration;

use chronicle_providers::ProviderSettings;
use chronicle_providers::retry::RetryConfig;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OPENAI_TEST_KEY: &str = "sk-test";
pub const ANTHROPIC_TEST_KEY: &str = "ant-test";

/// Provider settings aimed at `server` for both providers, without retry delays.
pub fn settings_for(server: &MockServer) -> ProviderSettings {
    ProviderSettings {
        openai_api_key: Some(OPENAI_TEST_KEY.to_string()),
        anthropic_api_key: Some(ANTHROPIC_TEST_KEY.to_string()),
        openai_base_url: format!("{}/v1", server.uri()),
        anthropic_base_url: format!("{}/v1", server.uri()),
        request_timeout: Duration::from_secs(5),
        retry: RetryConfig::no_retries(),
    }
}

/// Chat Completions reply body.
pub fn chat_completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    })
}

/// Mount a Chat Completions response that answers every request.
pub async fn mount_chat_response(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {OPENAI_TEST_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body(content)))
        .mount(server)
        .await;
}

/// Mount a Chat Completions response used for the next `times` requests only.
pub async fn mount_chat_response_times(server: &MockServer, content: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body(content)))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Mount a Chat Completions error response.
pub async fn mount_chat_error(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Anthropic Messages API response format
pub async fn mount_claude_response(server: &MockServer, content: &str) {
    let body = serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{
            "type": "text",
            "text": content
        }],
        "model": "claude-haiku-4-5",
        "stop_reason": "end_turn",
        "usage": {
            "input_tokens": 10,
            "output_tokens": 20
        }
    });

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", ANTHROPIC_TEST_KEY))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Request bodies the server has seen, parsed as JSON.
pub async fn received_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|request| serde_json::from_slice(&request.body).expect("JSON request body"))
        .collect()
}
