//! Hosted chat-completions adapter with SSE streaming

use crate::{
    error::ProviderError,
    providers::{capability_for, prompt_text},
    r#trait::{AgentProvider, ChatTurn, EventStream},
};
use futures::TryStreamExt;
use parley_foundation::{
    AuthConfig, HostedModelConfig, Message, MessageRole, ProviderCapability, ProviderKind,
    StreamEvent,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};
use uuid::Uuid;

/// Hosted model provider
pub struct OpenAiProvider {
    client: Client,
    config: HostedModelConfig,
}

impl OpenAiProvider {
    pub fn new(config: HostedModelConfig) -> Self {
        Self::with_client(super::http_client(), config)
    }

    pub fn with_client(client: Client, config: HostedModelConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, turn: &ChatTurn) -> String {
        let base = turn
            .contact
            .provider
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.config.base_url);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    /// Contact bearer token first, then the configured key
    fn api_key(&self, turn: &ChatTurn) -> Option<String> {
        match &turn.contact.provider.auth {
            AuthConfig::Bearer { token } if !token.is_empty() => Some(token.clone()),
            _ => self.config.api_key.clone(),
        }
    }

    fn build_request(&self, turn: &ChatTurn) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(turn.history.len() + 2);

        if let Some(system) = turn.contact.extra_str("systemPrompt") {
            messages.push(OpenAiMessage {
                role: "system",
                content: system.to_string(),
            });
        }

        for msg in &turn.history {
            messages.push(OpenAiMessage::from_message(msg));
        }
        messages.push(OpenAiMessage::from_message(&turn.message));

        let model = turn
            .contact
            .extra_str("model")
            .unwrap_or(&self.config.model)
            .to_string();

        OpenAiRequest {
            model,
            messages,
            stream: true,
        }
    }
}

impl AgentProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn capability(&self) -> ProviderCapability {
        capability_for(ProviderKind::OpenAi)
    }

    fn send_message_stream(&self, turn: &ChatTurn) -> EventStream {
        let request = self.build_request(turn);
        let url = self.endpoint(turn);
        let api_key = self.api_key(turn);
        let client = self.client.clone();
        let thread_id = turn.thread_id.clone();

        Box::pin(async_stream::stream! {
            let message_id = Uuid::new_v4().to_string();
            yield Ok(StreamEvent::message_start(message_id.clone(), thread_id));

            let Some(api_key) = api_key else {
                yield Err(ProviderError::NotConfigured(
                    "no API key for the hosted model".to_string(),
                ));
                return;
            };

            debug!(model = %request.model, url = %url, "Requesting completion stream");

            let response = match client
                .post(&url)
                .bearer_auth(&api_key)
                .header("Accept", "text/event-stream")
                .json(&request)
                .send()
                .await
            {
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

            yield Ok(StreamEvent::typing(true));

            let mut text = String::new();
            let byte_stream = response.bytes_stream();
            let stream_reader = StreamReader::new(
                byte_stream.map_err(std::io::Error::other),
            );
            let mut reader = BufReader::new(stream_reader);
            let mut line_buffer = String::new();

            loop {
                line_buffer.clear();
                match reader.read_line(&mut line_buffer).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = line_buffer.trim();

                        // Skip empty lines and comments
                        if line.is_empty() || line.starts_with(':') {
                            continue;
                        }

                        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                            continue;
                        };
                        if data == "[DONE]" {
                            break;
                        }

                        match serde_json::from_str::<OpenAiStreamChunk>(data) {
                            Ok(chunk) => {
                                for choice in chunk.choices {
                                    if let Some(content) = choice.delta.content {
                                        if !content.is_empty() {
                                            text.push_str(&content);
                                            yield Ok(StreamEvent::token(content));
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse SSE chunk: {} - data: {}", e, data);
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(ProviderError::StreamError(format!("Stream read error: {}", e)));
                        return;
                    }
                }
            }

            yield Ok(StreamEvent::typing(false));
            yield Ok(StreamEvent::message_end(message_id, text));
        })
    }
}

// ============================================================================
// API types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl OpenAiMessage {
    fn from_message(msg: &Message) -> Self {
        let role = match msg.role {
            MessageRole::User => "user",
            MessageRole::Agent => "assistant",
            MessageRole::System => "system",
        };
        Self {
            role,
            content: prompt_text(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}
