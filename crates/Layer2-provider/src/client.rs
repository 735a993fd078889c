//! Client for a Parley server
//!
//! Streams chat turns back as [`StreamEvent`]s and discovers which provider
//! kind a new contact should use.

use crate::{
    error::ProviderError,
    r#trait::EventStream,
    sse::{self, decode_stream},
};
use parley_foundation::{
    api::{routes, ChatRequest},
    ProviderCapability, ProviderKind, StreamEvent,
};
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

/// HTTP client for the Parley API
#[derive(Debug, Clone)]
pub struct ParleyClient {
    client: Client,
    base_url: String,
}

impl ParleyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(crate::providers::http_client(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Stream one chat turn
    ///
    /// Error events sent by the server arrive as `Ok(StreamEvent::Error)`;
    /// `Err` means the request or the transport failed.
    pub fn stream_chat(&self, request: &ChatRequest) -> EventStream {
        let send = self
            .client
            .post(self.url(routes::CHAT_STREAM))
            .header(header::ACCEPT, sse::CONTENT_TYPE)
            .json(request)
            .send();

        Box::pin(async_stream::stream! {
            let response = match send.await {
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

            let mut events = decode_stream(response.bytes_stream());
            while let Some(item) = futures::StreamExt::next(&mut events).await {
                yield item;
            }
        })
    }

    /// Capabilities of every provider the server offers
    ///
    /// Entries with kinds this client does not know are skipped.
    pub async fn capabilities(&self) -> Result<Vec<ProviderCapability>, ProviderError> {
        let entries: Vec<Value> = self.get_json(routes::PROVIDERS).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect())
    }

    /// Kind the server reports as its default
    pub async fn default_kind(&self) -> Result<ProviderKind, ProviderError> {
        let body: Value = self.get_json(routes::DEFAULT_PROVIDER).await?;
        body.get("kind")
            .and_then(Value::as_str)
            .and_then(|kind| kind.parse().ok())
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!("no usable default kind in {}", body))
            })
    }

    /// Kind to preselect for a new contact
    ///
    /// Never fails: unreachable endpoints fall through to `fallback`.
    pub async fn discover_kind(&self, preferred: ProviderKind, fallback: ProviderKind) -> ProviderKind {
        let default = match self.default_kind().await {
            Ok(kind) => Some(kind),
            Err(e) => {
                debug!("Default provider unavailable: {}", e);
                None
            }
        };
        if let Some(kind) = default {
            return kind;
        }

        let capabilities = match self.capabilities().await {
            Ok(caps) => Some(caps),
            Err(e) => {
                debug!("Provider list unavailable: {}", e);
                None
            }
        };
        choose_kind(None, capabilities.as_deref(), preferred, fallback)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let response = self.client.get(self.url(path)).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, body));
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

/// Discovery rule
///
/// The server default wins; otherwise `preferred` if the server offers it;
/// otherwise the first offered kind; otherwise `fallback`.
pub fn choose_kind(
    default: Option<ProviderKind>,
    capabilities: Option<&[ProviderCapability]>,
    preferred: ProviderKind,
    fallback: ProviderKind,
) -> ProviderKind {
    if let Some(kind) = default {
        return kind;
    }

    match capabilities {
        Some(caps) if caps.iter().any(|c| c.kind == preferred) => preferred,
        Some(caps) => caps.first().map(|c| c.kind).unwrap_or(fallback),
        None => fallback,
    }
}

/// Collected text of a finished turn, for callers that do not render tokens
pub fn final_text(events: &[StreamEvent]) -> Option<&str> {
    events.iter().rev().find_map(|event| match event {
        StreamEvent::MessageEnd { text, .. } => Some(text.as_str()),
        _ => None,
    })
}
