//! HTTP API surface shared by the server and the client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Contact, Message, ProviderKind};
use crate::error::{Error, Result};

/// Route paths
pub mod routes {
    pub const CHAT_STREAM: &str = "/api/chat/stream";
    pub const PROVIDERS: &str = "/api/providers";
    pub const DEFAULT_PROVIDER: &str = "/api/providers/default";
    pub const PUSH_REGISTER: &str = "/api/push/register";
    pub const ASYNC_TRIGGER: &str = "/api/async/trigger";
    pub const ASYNC_SCHEDULE: &str = "/api/async/schedule";
    pub const HEALTH: &str = "/health";
}

/// Shortest and longest allowed schedule delay
pub const MIN_DELAY_SECONDS: u64 = 1;
pub const MAX_DELAY_SECONDS: u64 = 3600;

/// Body of the chat streaming endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub thread_id: String,
    pub contact: Contact,
    pub message: Message,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ChatRequest {
    /// Reject requests that cannot start a stream
    pub fn validate(&self) -> Result<()> {
        require_non_blank("threadId", &self.thread_id)?;
        require_non_blank("contact.id", &self.contact.id)?;
        if self.message.text.trim().is_empty() && self.message.attachments.is_empty() {
            return Err(Error::validation(
                "message must carry text or at least one attachment",
            ));
        }
        Ok(())
    }
}

/// Body of the default-provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultProvider {
    pub kind: ProviderKind,
}

/// Body of the push-token registration endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRegistration {
    pub contact_id: String,
    pub thread_id: String,
    pub expo_push_token: String,
    #[serde(default)]
    pub platform: String,
}

impl PushRegistration {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("contactId", &self.contact_id)?;
        require_non_blank("threadId", &self.thread_id)?;
        require_non_blank("expoPushToken", &self.expo_push_token)
    }
}

/// Body of the immediate async trigger endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub contact: Contact,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TriggerRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("threadId", &self.thread_id)?;
        require_non_blank("contact.id", &self.contact.id)
    }
}

/// Body of the delayed async schedule endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub contact: Contact,
    pub thread_id: String,
    pub delay_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ScheduleRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("threadId", &self.thread_id)?;
        require_non_blank("contact.id", &self.contact.id)?;
        validate_delay(self.delay_seconds)
    }
}

/// Result of an async dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub delivered_to: usize,
    pub text: String,
}

/// Result of scheduling an async dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReceipt {
    pub job_id: String,
    pub fire_at: DateTime<Utc>,
}

/// `delaySeconds` must fall in `[1, 3600]`
pub fn validate_delay(delay_seconds: u64) -> Result<()> {
    if (MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS).contains(&delay_seconds) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "delaySeconds must be between {} and {}, got {}",
            MIN_DELAY_SECONDS, MAX_DELAY_SECONDS, delay_seconds
        )))
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}
