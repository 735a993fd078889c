//! CLI adapters over real subprocesses

#![cfg(unix)]

use futures::StreamExt;
use parley_foundation::{validate_turn, Contact, Message, ProviderKind, StreamEvent};
use parley_provider::{AgentProvider, ChatTurn, CliProvider, ProviderError};
use parley_task::LocalExecutor;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn local_provider() -> CliProvider {
    CliProvider::new(ProviderKind::LocalCli, Arc::new(LocalExecutor::new()))
}

async fn run(contact: Contact, text: &str) -> Vec<Result<StreamEvent, ProviderError>> {
    let turn = ChatTurn::new(contact, "t1", Message::user("t1", text));
    local_provider().send_message_stream(&turn).collect().await
}

fn end_text(events: &[StreamEvent]) -> &str {
    match events.last() {
        Some(StreamEvent::MessageEnd { text, .. }) => text,
        other => panic!("turn not closed by message_end: {:?}", other),
    }
}

#[tokio::test]
async fn test_json_output_is_normalized() {
    let contact = Contact::new("c1", "Script", ProviderKind::LocalCli)
        .with_extra("command", json!("sh"))
        .with_extra(
            "args",
            json!(["-c", "printf '{\"result\":\"%s\"}' \"$1\"", "sh", "{prompt}"]),
        )
        .with_extra("parse", json!("json"));

    let events: Vec<StreamEvent> = run(contact, "hi there")
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert!(validate_turn(&events).is_ok());
    assert_eq!(end_text(&events), "hi there");
}

#[tokio::test]
async fn test_stdin_prompt_and_line_tokens() {
    let contact = Contact::new("c1", "Cat", ProviderKind::LocalCli)
        .with_extra("command", json!("cat"))
        .with_extra("stdin", json!(true));

    let events: Vec<StreamEvent> = run(contact, "first\nsecond")
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert!(validate_turn(&events).is_ok());
    let tokens: Vec<&StreamEvent> = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Token { .. }))
        .collect();
    assert_eq!(
        tokens,
        vec![&StreamEvent::token("first\n"), &StreamEvent::token("second")]
    );
    assert_eq!(end_text(&events), "first\nsecond");
}

#[tokio::test]
async fn test_attachment_summary_reaches_prompt() {
    let contact = Contact::new("c1", "Echo", ProviderKind::LocalCli)
        .with_extra("command", json!("cat"))
        .with_extra("stdin", json!(true));
    let message = Message::user("t1", "see file").with_attachment(
        parley_foundation::Attachment::new(parley_foundation::AttachmentKind::File, "a.txt")
            .with_mime_type("text/plain"),
    );
    let turn = ChatTurn::new(contact, "t1", message);

    let events: Vec<StreamEvent> = local_provider()
        .send_message_stream(&turn)
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(
        end_text(&events),
        "see file\n\nAttachments: file:a.txt (text/plain)"
    );
}

#[tokio::test]
async fn test_timeout_surfaces_as_failure() {
    let contact = Contact::new("c1", "Slow", ProviderKind::LocalCli)
        .with_extra("command", json!("sleep"))
        .with_extra("args", json!(["5"]))
        .with_extra("stdin", json!(true))
        .with_extra("timeoutMs", json!(200));

    let started = Instant::now();
    let items = run(contact, "ignored").await;
    let elapsed = started.elapsed();

    match items.last() {
        Some(Err(err)) => assert_eq!(err.to_string(), "timed out after 200ms"),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(200), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_stderr_of_failed_command() {
    let contact = Contact::new("c1", "Broken", ProviderKind::LocalCli)
        .with_extra("command", json!("sh"))
        .with_extra("args", json!(["-c", "echo nope >&2; exit 3"]))
        .with_extra("stdin", json!(true));

    let items = run(contact, "ignored").await;
    match items.last() {
        Some(Err(err)) => assert_eq!(err.to_string(), "nope"),
        other => panic!("expected failure, got {:?}", other),
    }
}
