//! User-hosted HTTP agents
//!
//! Two payload flavors share one transport. The response is either an SSE
//! stream of canonical events, passed through [`TurnSealer`], or a single
//! JSON reply turned into start / token / end.

use crate::{
    error::ProviderError,
    normalize::extract_text,
    providers::{apply_auth, capability_for},
    r#trait::{AgentProvider, ChatTurn, EventStream},
    sse::{self, decode_stream},
    turn::TurnSealer,
};
use futures::StreamExt;
use parley_foundation::{Contact, ProviderCapability, ProviderKind, StreamEvent};
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

/// Payload shape spoken by the remote endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFlavor {
    /// Full structured message and history
    Agent,
    /// Flattened text, attachments and role/text history
    Webhook,
}

impl RemoteFlavor {
    pub fn kind(&self) -> ProviderKind {
        match self {
            RemoteFlavor::Agent => ProviderKind::HttpAgent,
            RemoteFlavor::Webhook => ProviderKind::Webhook,
        }
    }

    pub fn default_path(&self) -> &'static str {
        match self {
            RemoteFlavor::Agent => "/v1/chat",
            RemoteFlavor::Webhook => "/hooks/agent",
        }
    }

    /// Request body for `turn`
    pub fn payload(&self, turn: &ChatTurn) -> Value {
        let metadata = turn.metadata.clone().unwrap_or(Value::Null);
        match self {
            RemoteFlavor::Agent => json!({
                "threadId": turn.thread_id,
                "contact": {
                    "id": turn.contact.id,
                    "displayName": turn.contact.display_name,
                },
                "message": turn.message,
                "history": turn.history,
                "metadata": metadata,
            }),
            RemoteFlavor::Webhook => json!({
                "threadId": turn.thread_id,
                "contactId": turn.contact.id,
                "text": turn.message.text,
                "attachments": turn.message.attachments,
                "history": turn
                    .history
                    .iter()
                    .map(|m| json!({ "role": m.role, "text": m.text }))
                    .collect::<Vec<_>>(),
                "metadata": metadata,
            }),
        }
    }

    /// Endpoint URL: `extra.path` (absolute or relative to the base URL) or the default path
    pub fn endpoint(&self, contact: &Contact) -> Result<String, ProviderError> {
        let path = contact
            .extra_str("path")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.default_path());

        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }

        let base = contact
            .provider
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "{} contact '{}' has no baseUrl",
                    self.kind(),
                    contact.id
                ))
            })?;

        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// Adapter for `http-agent` and `webhook` contacts
pub struct RemoteHttpProvider {
    client: Client,
    flavor: RemoteFlavor,
}

impl RemoteHttpProvider {
    pub fn new(flavor: RemoteFlavor) -> Self {
        Self::with_client(super::http_client(), flavor)
    }

    pub fn with_client(client: Client, flavor: RemoteFlavor) -> Self {
        Self { client, flavor }
    }

    pub fn flavor(&self) -> RemoteFlavor {
        self.flavor
    }
}

impl AgentProvider for RemoteHttpProvider {
    fn kind(&self) -> ProviderKind {
        self.flavor.kind()
    }

    fn capability(&self) -> ProviderCapability {
        capability_for(self.flavor.kind())
    }

    fn send_message_stream(&self, turn: &ChatTurn) -> EventStream {
        let flavor = self.flavor;
        let client = self.client.clone();
        let endpoint = flavor.endpoint(&turn.contact);
        let payload = flavor.payload(turn);
        let auth = turn.contact.provider.auth.clone();
        let thread_id = turn.thread_id.clone();

        Box::pin(async_stream::stream! {
            let message_id = Uuid::new_v4().to_string();
            yield Ok(StreamEvent::message_start(message_id.clone(), thread_id));

            let url = match endpoint {
                Ok(url) => url,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            debug!(kind = %flavor.kind(), url = %url, "Posting turn to remote agent");

            let request = client
                .post(&url)
                .header(
                    header::ACCEPT,
                    format!("{}, application/json", sse::CONTENT_TYPE),
                )
                .json(&payload);

            let response = match apply_auth(request, &auth).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(ProviderError::Network(e.to_string()));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                yield Err(ProviderError::from_http_status(status, body));
                return;
            }

            let is_sse = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains(sse::CONTENT_TYPE))
                .unwrap_or(false);

            if is_sse {
                let mut sealer = TurnSealer::opened(message_id);
                let mut events = decode_stream(response.bytes_stream());

                while let Some(item) = events.next().await {
                    match item {
                        Ok(event) => {
                            if let Some(event) = sealer.accept(event) {
                                yield Ok(event);
                            }
                            if sealer.is_closed() {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                for event in sealer.finish() {
                    yield Ok(event);
                }
            } else {
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        yield Err(ProviderError::Network(e.to_string()));
                        return;
                    }
                };
                let text = match reply_text(&body) {
                    Ok(text) => text,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                yield Ok(StreamEvent::token(text.clone()));
                yield Ok(StreamEvent::message_end(message_id, text));
            }
        })
    }
}

/// Text of a single JSON reply: `text`, `message` or `output`, first present
fn reply_text(body: &str) -> Result<String, ProviderError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("reply is not JSON: {}", e)))?;

    let direct = ["text", "message", "output"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str));

    Ok(match direct {
        Some(text) => text.to_string(),
        None => extract_text(&value).unwrap_or_default(),
    })
}
