//! End-to-end trimming: real budgeter, HTTP completion against a mock, file audit

use chronicle_context::{
    AuditLabel, ConversationId, FileAuditSink, HistoryTrimmer, MessageHistory, ModelLimits,
    ModelRegistry, NullAuditSink, ProviderCompletion, SummaryError, SummarySettings,
    TiktokenBudgeter,
};
use chronicle_providers::ProviderClient;
use chronicle_types::{Message, MessageCycle};
use wiremock::MockServer;

use crate::common::{
    mount_chat_error, mount_chat_response, mount_chat_response_times, received_bodies,
    settings_for,
};

fn agent_history(rounds: usize) -> MessageHistory {
    let mut history = MessageHistory::new();
    for round in 0..rounds {
        history.append(MessageCycle::exchange(
            format!("Determine which next command to use (round {round})"),
            serde_json::json!({
                "thoughts": { "text": format!("thinking about round {round}") },
                "command": {
                    "name": "read_file",
                    "args": { "path": format!("notes_{round}.txt") },
                },
            })
            .to_string(),
            Some(format!("Command read_file returned: contents of notes_{round}.txt")),
        ));
    }
    history
}

fn conversation() -> ConversationId {
    ConversationId::with_created_at("tester", "20240101_120000")
}

#[tokio::test]
async fn trims_through_http_and_writes_audit_trail() {
    let server = MockServer::start().await;
    mount_chat_response(&server, "I read notes_0.txt and notes_1.txt.").await;
    let audit_dir = tempfile::tempdir().expect("tempdir");

    let trimmer = HistoryTrimmer::new(
        ProviderCompletion::new(ProviderClient::new(settings_for(&server)).expect("client")),
        TiktokenBudgeter::default(),
        FileAuditSink::new(audit_dir.path()),
        SummarySettings::new("gpt-3.5-turbo", conversation()),
    );
    let mut history = agent_history(3);
    let chain: Vec<Message> = history.cycles()[2].messages().to_vec();

    let result = trimmer.trim(&mut history, &chain).await.expect("trim");

    // Cursor starts at 0, so candidates begin at flattened index 1.
    assert_eq!(result.trimmed.len(), 5);
    assert_eq!(history.last_trimmed_index(), 5);
    assert_eq!(history.summary(), "I read notes_0.txt and notes_1.txt.");
    assert_eq!(
        result.summary_message.content(),
        "This reminds you of these events from your past: \nI read notes_0.txt and notes_1.txt."
    );

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let prompt = bodies[0]["messages"][0]["content"].as_str().expect("prompt text");
    assert!(prompt.contains("Summary So Far:\n\"\"\"\nI was created\n\"\"\""));
    assert!(prompt.contains(r#"{"role":"you""#));
    assert!(prompt.contains(r#"{"role":"your computer""#));
    assert!(!prompt.contains("thinking about round"));
    assert!(!prompt.contains("Determine which next command"));

    let record_dir = audit_dir.path().join("tester_20240101_120000").join("3");
    let prompt_file = record_dir.join(AuditLabel::SummaryPrompt.file_name());
    let recorded: Vec<Message> =
        serde_json::from_str(&std::fs::read_to_string(prompt_file).expect("prompt record"))
            .expect("prompt JSON");
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        std::fs::read_to_string(record_dir.join(AuditLabel::Summary.file_name()))
            .expect("summary record"),
        "I read notes_0.txt and notes_1.txt."
    );
}

#[tokio::test]
async fn retrimming_same_chain_sends_nothing() {
    let server = MockServer::start().await;
    mount_chat_response(&server, "I did round 0.").await;

    let trimmer = HistoryTrimmer::new(
        ProviderCompletion::new(ProviderClient::new(settings_for(&server)).expect("client")),
        TiktokenBudgeter::default(),
        NullAuditSink,
        SummarySettings::new("gpt-3.5-turbo", conversation()),
    );
    let mut history = agent_history(2);
    let chain: Vec<Message> = history.cycles()[1].messages().to_vec();

    trimmer.trim(&mut history, &chain).await.expect("first trim");
    let snapshot = history.clone();
    let second = trimmer.trim(&mut history, &chain).await.expect("second trim");

    assert!(second.trimmed.is_empty());
    assert_eq!(history, snapshot);
    assert_eq!(received_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn small_context_splits_into_batches_and_keeps_partial_progress() {
    let server = MockServer::start().await;
    mount_chat_response_times(&server, "I made progress.", 1).await;
    mount_chat_error(&server, 503, "overloaded").await;

    // Tight window so each event needs its own batch.
    let mut registry = ModelRegistry::new();
    registry.set_override("tiny-model", ModelLimits::new(160));
    let mut settings = SummarySettings::new("tiny-model", conversation());
    settings.prompt_template_overhead = 100;

    let trimmer = HistoryTrimmer::new(
        ProviderCompletion::new(ProviderClient::new(settings_for(&server)).expect("client")),
        TiktokenBudgeter::new(registry),
        NullAuditSink,
        settings,
    );
    let mut history = agent_history(2);

    let err = trimmer.trim(&mut history, &[]).await.unwrap_err();

    assert!(matches!(err, SummaryError::Completion(_)));
    assert_eq!(history.summary(), "I made progress.");
    assert_eq!(history.last_trimmed_index(), 0);
    assert_eq!(received_bodies(&server).await.len(), 2);
}
