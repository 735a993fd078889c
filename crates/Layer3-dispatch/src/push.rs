//! Push delivery
//!
//! `ExpoPushSender` talks to the Expo push API. `LogPushSender` only logs and
//! stands in when push is disabled.

use crate::error::DispatchError;
use async_trait::async_trait;
use parley_foundation::PushConfig;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// `type` tag carried in the push data of async messages
pub const ASYNC_MESSAGE_TYPE: &str = "async_message";

/// One notification fanned out to every token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    pub data: Value,
}

impl PushNotification {
    /// Notification for an agent message in `(contactId, threadId)`
    pub fn async_message(
        contact_id: &str,
        thread_id: &str,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: json!({
                "contactId": contact_id,
                "threadId": thread_id,
                "type": ASYNC_MESSAGE_TYPE,
            }),
        }
    }
}

/// Push-delivery collaborator
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, tokens: &[String], notification: &PushNotification) -> Result<(), DispatchError>;

    fn name(&self) -> &'static str;
}

/// Build the sender the configuration asks for
pub fn sender_from_config(config: &PushConfig, client: Client) -> Arc<dyn PushSender> {
    if config.enabled {
        Arc::new(ExpoPushSender::new(client, config))
    } else {
        info!("Push delivery disabled; notifications will only be logged");
        Arc::new(LogPushSender)
    }
}

/// Expo push API sender
pub struct ExpoPushSender {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
}

#[derive(Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a Value,
}

impl ExpoPushSender {
    pub fn new(client: Client, config: &PushConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
        }
    }
}

#[async_trait]
impl PushSender for ExpoPushSender {
    async fn send(&self, tokens: &[String], notification: &PushNotification) -> Result<(), DispatchError> {
        let messages: Vec<ExpoMessage<'_>> = tokens
            .iter()
            .map(|to| ExpoMessage {
                to,
                title: &notification.title,
                body: &notification.body,
                data: &notification.data,
            })
            .collect();

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&messages);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Push(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        debug!(tokens = tokens.len(), "Push accepted by Expo");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "expo"
    }
}

/// Sender that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPushSender;

#[async_trait]
impl PushSender for LogPushSender {
    async fn send(&self, tokens: &[String], notification: &PushNotification) -> Result<(), DispatchError> {
        info!(
            tokens = tokens.len(),
            title = %notification.title,
            body = %notification.body,
            "Push (log only)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
