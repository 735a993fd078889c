//! Core Types - shared data model
//!
//! Contacts, messages, attachments and the stream event protocol that every
//! provider adapter emits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// Provider Kind
// ============================================================================

/// Closed set of provider kinds a contact can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Hosted completion API (OpenAI-compatible)
    #[serde(rename = "openai")]
    OpenAi,

    /// Remote HTTP agent endpoint, structured payload
    #[serde(rename = "http-agent")]
    HttpAgent,

    /// Remote HTTP agent endpoint, flat webhook payload
    #[serde(rename = "webhook")]
    Webhook,

    /// Claude Code CLI
    #[serde(rename = "claude-cli")]
    ClaudeCli,

    /// Codex CLI
    #[serde(rename = "codex-cli")]
    CodexCli,

    /// Any other local executable
    #[serde(rename = "local-cli")]
    LocalCli,
}

impl ProviderKind {
    /// Every kind, in canonical registration order
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::OpenAi,
        ProviderKind::HttpAgent,
        ProviderKind::Webhook,
        ProviderKind::ClaudeCli,
        ProviderKind::CodexCli,
        ProviderKind::LocalCli,
    ];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::HttpAgent => "http-agent",
            ProviderKind::Webhook => "webhook",
            ProviderKind::ClaudeCli => "claude-cli",
            ProviderKind::CodexCli => "codex-cli",
            ProviderKind::LocalCli => "local-cli",
        }
    }

    /// Whether this kind is served by spawning a local executable
    pub fn is_cli(&self) -> bool {
        matches!(
            self,
            ProviderKind::ClaudeCli | ProviderKind::CodexCli | ProviderKind::LocalCli
        )
    }

    /// Infer the CLI kind from an executable path (`/usr/bin/claude` -> `claude-cli`)
    pub fn infer_from_command(command: &str) -> Self {
        let base = command
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(command)
            .to_ascii_lowercase();

        if base.starts_with("claude") {
            ProviderKind::ClaudeCli
        } else if base.starts_with("codex") {
            ProviderKind::CodexCli
        } else {
            ProviderKind::LocalCli
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownProviderKind(s.to_string()))
    }
}

// ============================================================================
// Contact
// ============================================================================

/// Authentication for a provider endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
}

/// Provider binding of a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactProvider {
    pub kind: ProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Provider-specific settings (command, args, cwd, env, timeoutMs, stdin, parse, path, ...)
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// One addressable agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub display_name: String,
    pub provider: ContactProvider,
}

impl Contact {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            provider: ContactProvider {
                kind,
                base_url: None,
                auth: AuthConfig::None,
                extra: Map::new(),
            },
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.provider.base_url = Some(base_url.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.provider.auth = auth;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.provider.extra.insert(key.into(), value);
        self
    }

    /// Shortcut for a string entry in `extra`
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.provider.extra.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// Message
// ============================================================================

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

/// Delivery status of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    #[default]
    Sent,
    Received,
    Read,
    Failed,
    Streaming,
}

/// Attachment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKind::Image => f.write_str("image"),
            AttachmentKind::File => f.write_str("file"),
        }
    }
}

/// File or image attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: AttachmentKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
}

impl Attachment {
    pub fn new(kind: AttachmentKind, name: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            name: name.into(),
            mime_type: None,
            size_bytes: None,
            uri: None,
            data_base64: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// `kind:name (mimeType)`, the mime part omitted when unknown
    pub fn summary(&self) -> String {
        match &self.mime_type {
            Some(mime) => format!("{}:{} ({})", self.kind, self.name, mime),
            None => format!("{}:{}", self.kind, self.name),
        }
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(thread_id: impl Into<String>, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            role,
            text: text.into(),
            attachments: Vec::new(),
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        }
    }

    /// Create a user message
    pub fn user(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(thread_id, MessageRole::User, text)
    }

    /// Create an agent message
    pub fn agent(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(thread_id, MessageRole::Agent, text)
    }

    /// Create a system message
    pub fn system(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(thread_id, MessageRole::System, text)
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

// ============================================================================
// Stream Events
// ============================================================================

/// Canonical event emitted by every provider adapter during one chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Opens the turn
    #[serde(rename_all = "camelCase")]
    MessageStart {
        message_id: String,
        thread_id: String,
        created_at: DateTime<Utc>,
    },

    /// Text delta
    Token { text: String },

    /// Attachment produced by the agent
    Attachment { attachment: Attachment },

    /// Typing indicator
    #[serde(rename_all = "camelCase")]
    Typing { is_typing: bool },

    /// Closes the turn with the full text
    #[serde(rename_all = "camelCase")]
    MessageEnd {
        message_id: String,
        text: String,
        status: MessageStatus,
        created_at: DateTime<Utc>,
    },

    /// Closes the turn with a failure
    Error {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl StreamEvent {
    pub fn message_start(message_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        StreamEvent::MessageStart {
            message_id: message_id.into(),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn token(text: impl Into<String>) -> Self {
        StreamEvent::Token { text: text.into() }
    }

    pub fn typing(is_typing: bool) -> Self {
        StreamEvent::Typing { is_typing }
    }

    /// A successful `message_end` stamped with the current time
    pub fn message_end(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        StreamEvent::MessageEnd {
            message_id: message_id.into(),
            text: text.into(),
            status: MessageStatus::Received,
            created_at: Utc::now(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        StreamEvent::Error {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// `message_end` or `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::MessageEnd { .. } | StreamEvent::Error { .. })
    }

    /// Wire name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            StreamEvent::MessageStart { .. } => "message_start",
            StreamEvent::Token { .. } => "token",
            StreamEvent::Attachment { .. } => "attachment",
            StreamEvent::Typing { .. } => "typing",
            StreamEvent::MessageEnd { .. } => "message_end",
            StreamEvent::Error { .. } => "error",
        }
    }
}

// ============================================================================
// Capability
// ============================================================================

/// Static descriptor of what a provider kind supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapability {
    pub kind: ProviderKind,
    pub supports_streaming: bool,
    pub supports_attachments: bool,
    pub supports_async: bool,
}
