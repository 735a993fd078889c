//! Config - server configuration
//!
//! Defaults plus `PARLEY_*` environment overrides. Command-line flags are
//! layered on top by the binary.

use crate::core::ProviderKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Hosted completion API defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedModelConfig {
    /// API root; `/chat/completions` is appended
    pub base_url: String,

    /// Used when the contact carries no bearer token
    pub api_key: Option<String>,

    /// Model used when the contact does not set `extra.model`
    pub model: String,
}

impl Default for HostedModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

/// Push delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// When false, pushes are only logged
    pub enabled: bool,

    /// Expo push endpoint
    pub endpoint: String,

    /// Optional Expo access token
    pub access_token: Option<String>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_EXPO_PUSH_URL.to_string(),
            access_token: None,
        }
    }
}

/// A single local executable the server is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedCommand {
    pub command: String,
    pub args: Vec<String>,
}

impl WrappedCommand {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Provider kind reported for this command
    pub fn kind(&self) -> ProviderKind {
        ProviderKind::infer_from_command(&self.command)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Kind reported by the default-provider endpoint
    pub default_kind: ProviderKind,

    /// Wrapped-command mode; bypasses the registry when set
    pub wrapped: Option<WrappedCommand>,

    pub hosted: HostedModelConfig,

    pub push: PushConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            default_kind: ProviderKind::OpenAi,
            wrapped: None,
            hosted: HostedModelConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("PARLEY_BIND") {
            config.bind_addr = addr;
        }

        if let Some(kind) = get("PARLEY_DEFAULT_PROVIDER") {
            config.default_kind = kind
                .parse()
                .map_err(|_| Error::Config(format!("PARLEY_DEFAULT_PROVIDER: unknown kind '{}'", kind)))?;
        }

        if let Some(command) = get("PARLEY_WRAP_COMMAND") {
            let args = get("PARLEY_WRAP_ARGS")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            config.wrapped = Some(WrappedCommand::new(command, args));
        }

        if let Some(base_url) = get("PARLEY_OPENAI_BASE_URL") {
            config.hosted.base_url = base_url;
        }
        config.hosted.api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("PARLEY_OPENAI_MODEL") {
            config.hosted.model = model;
        }

        if let Some(enabled) = get("PARLEY_PUSH_ENABLED") {
            config.push.enabled = parse_bool(&enabled)
                .ok_or_else(|| Error::Config(format!("PARLEY_PUSH_ENABLED: not a boolean '{}'", enabled)))?;
        }
        if let Some(endpoint) = get("PARLEY_EXPO_PUSH_URL") {
            config.push.endpoint = endpoint;
        }
        config.push.access_token = get("EXPO_ACCESS_TOKEN");

        Ok(config)
    }

    /// Kind the default-provider endpoint reports
    pub fn effective_default_kind(&self) -> ProviderKind {
        self.wrapped
            .as_ref()
            .map(WrappedCommand::kind)
            .unwrap_or(self.default_kind)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
