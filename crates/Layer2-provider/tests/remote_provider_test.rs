//! Remote HTTP adapters against in-process agent servers

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use parking_lot::Mutex;
use parley_foundation::{validate_turn, AuthConfig, Contact, Message, ProviderKind, StreamEvent};
use parley_provider::{AgentProvider, ChatTurn, ProviderError, RemoteFlavor, RemoteHttpProvider};
use serde_json::{json, Value};
use std::sync::Arc;

type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn record_json(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.lock().push((auth, body));
    Json(json!({ "message": "pong", "output": "ignored" }))
}

async fn sse_reply() -> impl axum::response::IntoResponse {
    let body = concat!(
        "data: {\"type\":\"message_start\",\"messageId\":\"theirs\",\"threadId\":\"t1\",\"createdAt\":\"2024-05-01T10:00:00Z\"}\n\n",
        "data: {\"type\":\"typing\",\"isTyping\":true}\n\n",
        ": keepalive\n\n",
        "data: {\"type\":\"token\",\"text\":\"Hel\"}\n\n",
        "data: {\"token\":\"lo\"}\n\n",
        "data: [DONE]\n\n",
    );
    ([(header::CONTENT_TYPE, "text/event-stream")], body)
}

async fn failing() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "agent exploded")
}

async fn collect(provider: &RemoteHttpProvider, turn: &ChatTurn) -> Vec<Result<StreamEvent, ProviderError>> {
    provider.send_message_stream(turn).collect().await
}

fn ok_events(items: Vec<Result<StreamEvent, ProviderError>>) -> Vec<StreamEvent> {
    items.into_iter().map(|item| item.expect("unexpected failure")).collect()
}

#[tokio::test]
async fn test_agent_json_reply() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/v1/chat", post(record_json))
        .with_state(seen.clone());
    let base = serve(app).await;

    let contact = Contact::new("c1", "Agent", ProviderKind::HttpAgent)
        .with_base_url(base)
        .with_auth(AuthConfig::Bearer { token: "secret".into() });
    let turn = ChatTurn::new(contact, "t1", Message::user("t1", "ping"))
        .with_history(vec![Message::agent("t1", "earlier")]);

    let provider = RemoteHttpProvider::new(RemoteFlavor::Agent);
    let events = ok_events(collect(&provider, &turn).await);

    assert!(validate_turn(&events).is_ok());
    assert_eq!(events.len(), 3);
    assert_eq!(events[1], StreamEvent::token("pong"));
    assert!(matches!(&events[2], StreamEvent::MessageEnd { text, .. } if text == "pong"));

    let seen = seen.lock();
    assert_eq!(seen[0].0.as_deref(), Some("Bearer secret"));
    assert_eq!(seen[0].1["threadId"], "t1");
    assert_eq!(seen[0].1["contact"]["id"], "c1");
    assert_eq!(seen[0].1["message"]["text"], "ping");
    assert_eq!(seen[0].1["history"][0]["text"], "earlier");
}

#[tokio::test]
async fn test_webhook_custom_path_and_basic_auth() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/custom/hook", post(record_json))
        .with_state(seen.clone());
    let base = serve(app).await;

    let contact = Contact::new("c9", "Hook", ProviderKind::Webhook)
        .with_base_url(format!("{}/", base))
        .with_auth(AuthConfig::Basic {
            username: "user".into(),
            password: "pass".into(),
        })
        .with_extra("path", json!("/custom/hook"));
    let turn = ChatTurn::new(contact, "t2", Message::user("t2", "hello"));

    let provider = RemoteHttpProvider::new(RemoteFlavor::Webhook);
    let events = ok_events(collect(&provider, &turn).await);
    assert!(validate_turn(&events).is_ok());

    let seen = seen.lock();
    assert!(seen[0].0.as_deref().unwrap_or_default().starts_with("Basic "));
    assert_eq!(seen[0].1["contactId"], "c9");
    assert_eq!(seen[0].1["text"], "hello");
}

#[tokio::test]
async fn test_sse_reply_is_sealed() {
    let app = Router::new().route("/v1/chat", post(sse_reply));
    let base = serve(app).await;

    let contact = Contact::new("c1", "Agent", ProviderKind::HttpAgent).with_base_url(base);
    let turn = ChatTurn::new(contact, "t1", Message::user("t1", "hi"));

    let provider = RemoteHttpProvider::new(RemoteFlavor::Agent);
    let events = ok_events(collect(&provider, &turn).await);

    assert!(validate_turn(&events).is_ok(), "{:?}", events);
    let tokens: Vec<&StreamEvent> = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Token { .. }))
        .collect();
    assert_eq!(tokens, vec![&StreamEvent::token("Hel"), &StreamEvent::token("lo")]);

    let start_id = match &events[0] {
        StreamEvent::MessageStart { message_id, .. } => message_id.clone(),
        other => panic!("unexpected first event {:?}", other),
    };
    assert_ne!(start_id, "theirs");
    assert_eq!(events[events.len() - 2], StreamEvent::typing(false));
    match events.last() {
        Some(StreamEvent::MessageEnd { message_id, text, .. }) => {
            assert_eq!(message_id, &start_id);
            assert_eq!(text, "Hello");
        }
        other => panic!("unexpected last event {:?}", other),
    }
}

#[tokio::test]
async fn test_http_failure_keeps_body() {
    let app = Router::new().route("/hooks/agent", post(failing));
    let base = serve(app).await;

    let contact = Contact::new("c1", "Hook", ProviderKind::Webhook).with_base_url(base);
    let turn = ChatTurn::new(contact, "t1", Message::user("t1", "hi"));

    let provider = RemoteHttpProvider::new(RemoteFlavor::Webhook);
    let items = collect(&provider, &turn).await;

    assert_eq!(items.len(), 2);
    assert!(matches!(items[0], Ok(StreamEvent::MessageStart { .. })));
    match &items[1] {
        Err(err) => assert_eq!(err.to_string(), "HTTP 500: agent exploded"),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_base_url() {
    let contact = Contact::new("c1", "Agent", ProviderKind::HttpAgent);
    let turn = ChatTurn::new(contact, "t1", Message::user("t1", "hi"));

    let provider = RemoteHttpProvider::new(RemoteFlavor::Agent);
    let items = collect(&provider, &turn).await;
    assert!(matches!(items.last(), Some(Err(ProviderError::NotConfigured(_)))));
}
