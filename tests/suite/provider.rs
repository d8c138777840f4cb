//! Provider client tests against mock HTTP endpoints

use chronicle_context::{CompletionError, CompletionService, ProviderCompletion};
use chronicle_providers::{ProviderClient, ProviderError};
use chronicle_types::{Message, Role};
use wiremock::MockServer;

use crate::common::{
    mount_chat_error, mount_chat_response, mount_claude_response, received_bodies, settings_for,
};

#[tokio::test]
async fn openai_reply_becomes_assistant_message() {
    let server = MockServer::start().await;
    mount_chat_response(&server, "I summarized it.").await;
    let client = ProviderClient::new(settings_for(&server)).expect("client");

    let reply = client
        .complete(&[Message::user("Summarize")], "gpt-3.5-turbo")
        .await
        .expect("completion");

    assert_eq!(reply, Message::assistant("I summarized it."));

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "gpt-3.5-turbo");
    assert_eq!(bodies[0]["stream"], false);
    assert_eq!(bodies[0]["messages"][0]["role"], "user");
    assert_eq!(bodies[0]["messages"][0]["content"], "Summarize");
}

#[tokio::test]
async fn first_person_roles_are_mapped_for_the_api() {
    let server = MockServer::start().await;
    mount_chat_response(&server, "ok").await;
    let client = ProviderClient::new(settings_for(&server)).expect("client");

    client
        .complete(
            &[
                Message::new(Role::You, "I acted"),
                Message::new(Role::YourComputer, "It worked"),
            ],
            "gpt-4o",
        )
        .await
        .expect("completion");

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies[0]["messages"][0]["role"], "assistant");
    assert_eq!(bodies[0]["messages"][1]["role"], "system");
}

#[tokio::test]
async fn claude_models_use_messages_api() {
    let server = MockServer::start().await;
    mount_claude_response(&server, "I read the file.").await;
    let client = ProviderClient::new(settings_for(&server)).expect("client");

    let reply = client
        .complete(
            &[Message::system("Be brief"), Message::user("Summarize")],
            "claude-haiku-4-5",
        )
        .await
        .expect("completion");

    assert_eq!(reply.content(), "I read the file.");
    let bodies = received_bodies(&server).await;
    assert_eq!(bodies[0]["system"], "Be brief");
    assert_eq!(bodies[0]["messages"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn api_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    mount_chat_error(&server, 401, "invalid api key").await;
    let client = ProviderClient::new(settings_for(&server)).expect("client");

    let err = client
        .complete(&[Message::user("hi")], "gpt-3.5-turbo")
        .await
        .unwrap_err();

    match err {
        ProviderError::Api { status, body, .. } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn completion_service_maps_provider_errors() {
    let server = MockServer::start().await;
    mount_chat_error(&server, 500, "overloaded").await;
    let service =
        ProviderCompletion::new(ProviderClient::new(settings_for(&server)).expect("client"));

    let err = service
        .complete(&[Message::user("hi")], "gpt-3.5-turbo")
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Api { status: 500, .. }));
}

#[tokio::test]
async fn malformed_reply_is_reported() {
    use wiremock::matchers::method;
    use wiremock::{Mock, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
        )
        .mount(&server)
        .await;
    let client = ProviderClient::new(settings_for(&server)).expect("client");

    let err = client
        .complete(&[Message::user("hi")], "gpt-3.5-turbo")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::MalformedResponse { .. }));
}
