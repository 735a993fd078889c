//! Locally installed agent CLIs
//!
//! The prompt goes through the process wrapper; the normalized output is
//! re-emitted as line tokens. CLIs do not stream, so the whole answer arrives
//! after the process exits.

use crate::{
    error::ProviderError,
    normalize::{line_tokens, normalize_output},
    providers::{capability_for, prompt_text},
    r#trait::{AgentProvider, ChatTurn, EventStream},
};
use parley_foundation::{ProviderCapability, ProviderKind, StreamEvent, WrappedCommand};
use parley_task::{CommandDefaults, CommandSpec, Executor, ParseMode};
use serde_json::Map;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-kind invocation defaults
pub fn defaults_for(kind: ProviderKind) -> CommandDefaults {
    match kind {
        ProviderKind::ClaudeCli => CommandDefaults::new(
            "claude",
            &["-p", "{prompt}", "--output-format", "json"],
            ParseMode::Json,
        ),
        ProviderKind::CodexCli => {
            CommandDefaults::new("codex", &["exec", "{prompt}"], ParseMode::Text)
        }
        _ => CommandDefaults::without_command(ParseMode::Text),
    }
}

/// Where the invocation comes from
enum Invocation {
    /// Contact `extra` over per-kind defaults
    PerContact(CommandDefaults),
    /// Fixed command of wrapped mode; contact settings are ignored
    Wrapped(CommandDefaults),
}

/// Adapter for the CLI kinds
pub struct CliProvider {
    kind: ProviderKind,
    invocation: Invocation,
    executor: Arc<dyn Executor>,
}

impl CliProvider {
    /// Adapter for a CLI kind using its standard defaults
    pub fn new(kind: ProviderKind, executor: Arc<dyn Executor>) -> Self {
        Self {
            kind,
            invocation: Invocation::PerContact(defaults_for(kind)),
            executor,
        }
    }

    /// Adapter answering every contact with one fixed command
    ///
    /// The kind is inferred from the command name. Empty `args` fall back to
    /// the inferred kind's default arguments.
    pub fn wrapped(command: &WrappedCommand, executor: Arc<dyn Executor>) -> Self {
        let kind = command.kind();
        let base = defaults_for(kind);
        let args = if command.args.is_empty() {
            base.args
        } else {
            command.args.clone()
        };

        Self {
            kind,
            invocation: Invocation::Wrapped(CommandDefaults {
                command: Some(command.command.clone()),
                args,
                parse: base.parse,
                stdin: false,
            }),
            executor,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self.invocation, Invocation::Wrapped(_))
    }

    fn command_spec(&self, turn: &ChatTurn) -> Result<CommandSpec, ProviderError> {
        let spec = match &self.invocation {
            Invocation::PerContact(defaults) => {
                CommandSpec::resolve(&turn.contact.provider.extra, defaults)?
            }
            Invocation::Wrapped(defaults) => CommandSpec::resolve(&Map::new(), defaults)?,
        };
        Ok(spec)
    }
}

impl AgentProvider for CliProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn capability(&self) -> ProviderCapability {
        capability_for(self.kind)
    }

    fn send_message_stream(&self, turn: &ChatTurn) -> EventStream {
        let spec = self.command_spec(turn);
        let prompt = prompt_text(&turn.message);
        let executor = Arc::clone(&self.executor);
        let thread_id = turn.thread_id.clone();
        let kind = self.kind;

        Box::pin(async_stream::stream! {
            let message_id = Uuid::new_v4().to_string();
            yield Ok(StreamEvent::message_start(message_id.clone(), thread_id));

            let spec = match spec {
                Ok(spec) => spec,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            yield Ok(StreamEvent::typing(true));
            debug!(kind = %kind, command = %spec.command, executor = executor.name(), "Running CLI turn");

            let output = match executor.run(&spec, &prompt).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(kind = %kind, "CLI turn failed: {}", e);
                    yield Err(ProviderError::from(e));
                    return;
                }
            };

            if !output.success() {
                let message = output.failure_message();
                warn!(kind = %kind, exit_code = output.exit_code, "CLI exited with failure: {}", message);
                yield Err(ProviderError::Cli(message));
                return;
            }

            let text = normalize_output(&output.stdout, &output.stderr, spec.parse);
            for token in line_tokens(&text) {
                yield Ok(StreamEvent::token(token));
            }

            yield Ok(StreamEvent::typing(false));
            yield Ok(StreamEvent::message_end(message_id, text));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use parley_foundation::{validate_turn, Contact, Message};
    use parley_task::{CliError, ProcessOutput};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records invocations and replays a canned result
    struct ScriptedExecutor {
        calls: Mutex<Vec<(CommandSpec, String)>>,
        reply: Result<ProcessOutput, fn() -> CliError>,
    }

    impl ScriptedExecutor {
        fn ok(stdout: &str, stderr: &str, exit_code: i32) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: Ok(ProcessOutput {
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                    exit_code,
                }),
            })
        }

        fn failing(err: fn() -> CliError) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: Err(err),
            })
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn run(&self, spec: &CommandSpec, prompt: &str) -> Result<ProcessOutput, CliError> {
            self.calls.lock().push((spec.clone(), prompt.to_string()));
            match &self.reply {
                Ok(output) => Ok(output.clone()),
                Err(make) => Err(make()),
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn turn(contact: Contact, text: &str) -> ChatTurn {
        ChatTurn::new(contact, "t1", Message::user("t1", text))
    }

    async fn collect(stream: EventStream) -> Vec<Result<StreamEvent, ProviderError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_claude_json_answer() {
        let executor = ScriptedExecutor::ok(r#"{"type":"result","result":"line a\nline b"}"#, "", 0);
        let provider = CliProvider::new(ProviderKind::ClaudeCli, executor.clone());
        let contact = Contact::new("c1", "Claude", ProviderKind::ClaudeCli);

        let items = collect(provider.send_message_stream(&turn(contact, "hello"))).await;
        let events: Vec<StreamEvent> = items.into_iter().map(Result::unwrap).collect();

        assert!(validate_turn(&events).is_ok());
        assert_eq!(events[1], StreamEvent::typing(true));
        assert_eq!(events[2], StreamEvent::token("line a\n"));
        assert_eq!(events[3], StreamEvent::token("line b"));
        assert_eq!(events[4], StreamEvent::typing(false));
        assert!(matches!(&events[5], StreamEvent::MessageEnd { text, .. } if text == "line a\nline b"));

        let calls = executor.calls.lock();
        assert_eq!(calls[0].0.command, "claude");
        assert_eq!(calls[0].0.parse, ParseMode::Json);
        assert_eq!(calls[0].1, "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_becomes_error() {
        let executor = ScriptedExecutor::ok("", "boom\n", 2);
        let provider = CliProvider::new(ProviderKind::CodexCli, executor);
        let contact = Contact::new("c1", "Codex", ProviderKind::CodexCli);

        let items = collect(provider.send_message_stream(&turn(contact, "go"))).await;
        assert!(matches!(items[0], Ok(StreamEvent::MessageStart { .. })));
        match items.last() {
            Some(Err(err)) => assert_eq!(err.to_string(), "boom"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_message_passes_through() {
        let executor = ScriptedExecutor::failing(|| CliError::TimedOut(50));
        let provider = CliProvider::new(ProviderKind::CodexCli, executor);
        let contact = Contact::new("c1", "Codex", ProviderKind::CodexCli);

        let items = collect(provider.send_message_stream(&turn(contact, "go"))).await;
        match items.last() {
            Some(Err(err)) => assert_eq!(err.to_string(), "timed out after 50ms"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_cli_requires_command() {
        let executor = ScriptedExecutor::ok("unused", "", 0);
        let provider = CliProvider::new(ProviderKind::LocalCli, executor.clone());
        let contact = Contact::new("c1", "Local", ProviderKind::LocalCli);

        let items = collect(provider.send_message_stream(&turn(contact, "go"))).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(ProviderError::NotConfigured(_))));
        assert!(executor.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_wrapped_ignores_contact_command() {
        let executor = ScriptedExecutor::ok("plain answer", "", 0);
        let provider = CliProvider::wrapped(
            &WrappedCommand::new("/usr/bin/codex", Vec::new()),
            executor.clone(),
        );
        assert!(provider.is_wrapped());
        assert_eq!(provider.kind(), ProviderKind::CodexCli);

        let contact = Contact::new("c1", "Anyone", ProviderKind::LocalCli)
            .with_extra("command", json!("rm"));
        let items = collect(provider.send_message_stream(&turn(contact, "go"))).await;
        assert!(items.iter().all(Result::is_ok));

        let calls = executor.calls.lock();
        assert_eq!(calls[0].0.command, "/usr/bin/codex");
        assert_eq!(calls[0].0.args, vec!["exec", "{prompt}"]);
    }
}
