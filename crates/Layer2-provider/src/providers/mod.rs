//! Provider adapters
//!
//! - `openai`: hosted chat-completions model
//! - `remote`: user-hosted HTTP agents (`http-agent` and `webhook`)
//! - `cli`: locally installed agent CLIs (`claude-cli`, `codex-cli`, `local-cli`)

pub mod cli;
pub mod openai;
pub mod remote;

pub use cli::CliProvider;
pub use openai::OpenAiProvider;
pub use remote::{RemoteFlavor, RemoteHttpProvider};

use parley_foundation::{AuthConfig, Message, ProviderCapability, ProviderKind};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::warn;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP client shared by the network adapters
///
/// Only connecting is bounded; a streamed answer may take as long as it takes.
pub fn http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Static capability table
pub fn capability_for(kind: ProviderKind) -> ProviderCapability {
    let (supports_streaming, supports_attachments) = match kind {
        ProviderKind::OpenAi => (true, false),
        ProviderKind::HttpAgent | ProviderKind::Webhook => (true, true),
        ProviderKind::ClaudeCli | ProviderKind::CodexCli | ProviderKind::LocalCli => (false, true),
    };

    ProviderCapability {
        kind,
        supports_streaming,
        supports_attachments,
        supports_async: true,
    }
}

/// Message text with a one-line attachment summary appended
pub fn prompt_text(message: &Message) -> String {
    if message.attachments.is_empty() {
        return message.text.clone();
    }

    let summary = message
        .attachments
        .iter()
        .map(|a| a.summary())
        .collect::<Vec<_>>()
        .join(", ");

    if message.text.trim().is_empty() {
        format!("Attachments: {}", summary)
    } else {
        format!("{}\n\nAttachments: {}", message.text, summary)
    }
}

pub(crate) fn apply_auth(request: RequestBuilder, auth: &AuthConfig) -> RequestBuilder {
    match auth {
        AuthConfig::None => request,
        AuthConfig::Bearer { token } => request.bearer_auth(token),
        AuthConfig::Basic { username, password } => request.basic_auth(username, Some(password)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_foundation::{Attachment, AttachmentKind};

    #[test]
    fn test_prompt_text_with_attachments() {
        let message = Message::user("t1", "look at these")
            .with_attachment(Attachment::new(AttachmentKind::Image, "cat.png").with_mime_type("image/png"))
            .with_attachment(Attachment::new(AttachmentKind::File, "notes.txt"));

        assert_eq!(
            prompt_text(&message),
            "look at these\n\nAttachments: image:cat.png (image/png), file:notes.txt"
        );
        assert_eq!(prompt_text(&Message::user("t1", "plain")), "plain");
    }

    #[test]
    fn test_capability_table() {
        assert!(!capability_for(ProviderKind::OpenAi).supports_attachments);
        assert!(capability_for(ProviderKind::Webhook).supports_streaming);
        assert!(!capability_for(ProviderKind::LocalCli).supports_streaming);
        assert!(ProviderKind::ALL
            .into_iter()
            .all(|kind| capability_for(kind).supports_async));
    }
}
