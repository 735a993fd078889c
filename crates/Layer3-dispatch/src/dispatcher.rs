//! Async dispatcher
//!
//! Produces an agent message outside a chat stream and delivers it over push,
//! either now (`trigger`) or after a delay (`schedule`). Scheduled jobs live
//! in the injected job store until their timer fires; nothing survives a
//! restart.

use crate::error::DispatchError;
use crate::push::{PushNotification, PushSender};
use chrono::Utc;
use futures::StreamExt;
use parley_foundation::{
    api::{validate_delay, DispatchOutcome, ScheduleReceipt},
    Contact, HistoryLookup, JobStore, Message, PushTokenStore, ScheduledJob, StreamEvent,
};
use parley_provider::{ChatTurn, ProviderResolver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prompt sent to the provider when no text is supplied
pub const FILLER_PROMPT: &str = "send a short one-sentence follow-up";

/// Used when the provider produces nothing usable
pub const CANNED_FOLLOW_UP: &str = "Just checking in. Let me know if there is anything else I can help with.";

/// Trigger and schedule out-of-band agent messages
#[derive(Clone)]
pub struct AsyncDispatcher {
    resolver: Arc<dyn ProviderResolver>,
    tokens: Arc<dyn PushTokenStore>,
    jobs: Arc<dyn JobStore>,
    push: Arc<dyn PushSender>,
    history: Option<Arc<dyn HistoryLookup>>,
}

impl AsyncDispatcher {
    pub fn new(
        resolver: Arc<dyn ProviderResolver>,
        tokens: Arc<dyn PushTokenStore>,
        jobs: Arc<dyn JobStore>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            resolver,
            tokens,
            jobs,
            push,
            history: None,
        }
    }

    /// Give filler generation the thread's history
    pub fn with_history(mut self, history: Arc<dyn HistoryLookup>) -> Self {
        self.history = Some(history);
        self
    }

    /// Produce text and push it to every token of `(contact.id, thread_id)`
    ///
    /// Supplied non-blank `text` is used verbatim; otherwise the contact's
    /// provider writes a filler. With no registered tokens nothing is sent.
    pub async fn trigger(
        &self,
        contact: &Contact,
        thread_id: &str,
        text: Option<&str>,
    ) -> Result<DispatchOutcome, DispatchError> {
        require("threadId", thread_id)?;
        require("contact.id", &contact.id)?;

        let text = match text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text.to_string(),
            None => self.filler(contact, thread_id).await?,
        };

        let tokens = self.tokens.tokens_for(&contact.id, thread_id).await;
        if tokens.is_empty() {
            debug!(contact = %contact.id, thread = %thread_id, "No push tokens registered");
            return Ok(DispatchOutcome {
                delivered_to: 0,
                text,
            });
        }

        let notification =
            PushNotification::async_message(&contact.id, thread_id, &contact.display_name, &text);
        self.push.send(&tokens, &notification).await?;

        info!(
            contact = %contact.id,
            thread = %thread_id,
            tokens = tokens.len(),
            sender = self.push.name(),
            "Async message delivered"
        );

        Ok(DispatchOutcome {
            delivered_to: tokens.len(),
            text,
        })
    }

    /// Arm a timer that runs `trigger` after `delay_seconds`
    ///
    /// Returns at once. A failure on fire is logged; the job id leaves the
    /// pending set either way.
    pub async fn schedule(
        &self,
        contact: &Contact,
        thread_id: &str,
        delay_seconds: u64,
        text: Option<&str>,
    ) -> Result<ScheduleReceipt, DispatchError> {
        require("threadId", thread_id)?;
        require("contact.id", &contact.id)?;
        validate_delay(delay_seconds)?;

        let job_id = Uuid::new_v4().to_string();
        let fire_at = Utc::now() + chrono::Duration::seconds(delay_seconds as i64);

        self.jobs
            .insert(ScheduledJob {
                job_id: job_id.clone(),
                contact_id: contact.id.clone(),
                thread_id: thread_id.to_string(),
                fire_at,
            })
            .await;

        let dispatcher = self.clone();
        let contact = contact.clone();
        let thread_id = thread_id.to_string();
        let text = text.map(str::to_string);
        let id = job_id.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_seconds)).await;

            match dispatcher.trigger(&contact, &thread_id, text.as_deref()).await {
                Ok(outcome) => debug!(
                    job = %id,
                    delivered_to = outcome.delivered_to,
                    "Scheduled job fired"
                ),
                Err(e) => warn!(job = %id, "Scheduled job failed: {}", e),
            }

            dispatcher.jobs.remove(&id).await;
        });

        info!(job = %job_id, delay_seconds, "Scheduled async message");
        Ok(ScheduleReceipt { job_id, fire_at })
    }

    /// Jobs whose timers have not fired yet
    pub async fn pending(&self) -> Vec<ScheduledJob> {
        self.jobs.pending().await
    }

    /// Ask the contact's provider for a one-line follow-up
    async fn filler(&self, contact: &Contact, thread_id: &str) -> Result<String, DispatchError> {
        let provider = match self.resolver.resolve(contact) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(contact = %contact.id, "Filler generation failed: {}", e);
                return Ok(CANNED_FOLLOW_UP.to_string());
            }
        };

        let history = match &self.history {
            Some(lookup) => lookup.history(thread_id).await,
            None => Vec::new(),
        };
        let turn = ChatTurn::new(
            contact.clone(),
            thread_id,
            Message::user(thread_id, FILLER_PROMPT),
        )
        .with_history(history);

        let mut events = provider.send_message_stream(&turn);
        let mut tokens = String::new();
        let mut final_text = None;

        while let Some(item) = events.next().await {
            match item {
                Ok(StreamEvent::Token { text }) => tokens.push_str(&text),
                Ok(StreamEvent::MessageEnd { text, .. }) => {
                    final_text = Some(text);
                    break;
                }
                Ok(StreamEvent::Error { message, .. }) => {
                    warn!(contact = %contact.id, "Filler generation failed: {}", message);
                    return Ok(CANNED_FOLLOW_UP.to_string());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(contact = %contact.id, "Filler generation failed: {}", e);
                    return Ok(CANNED_FOLLOW_UP.to_string());
                }
            }
        }

        let text = final_text.unwrap_or(tokens);
        let text = text.trim();
        if text.is_empty() {
            Ok(CANNED_FOLLOW_UP.to_string())
        } else {
            Ok(text.to_string())
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), DispatchError> {
    if value.trim().is_empty() {
        Err(DispatchError::Invalid(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use parking_lot::Mutex;
    use parley_foundation::{
        api::PushRegistration, InMemoryHistory, InMemoryJobStore, InMemoryPushTokenStore,
        ProviderCapability, ProviderKind,
    };
    use parley_provider::{
        capability_for, AgentProvider, EventStream, ProviderError, ProviderRegistry,
    };

    /// Provider replaying a fixed event script
    struct ScriptedProvider {
        script: Vec<Result<StreamEvent, ProviderError>>,
        prompts: Mutex<Vec<(String, usize)>>,
    }

    impl AgentProvider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::LocalCli
        }

        fn capability(&self) -> ProviderCapability {
            capability_for(ProviderKind::LocalCli)
        }

        fn send_message_stream(&self, turn: &ChatTurn) -> EventStream {
            self.prompts
                .lock()
                .push((turn.message.text.clone(), turn.history.len()));
            Box::pin(stream::iter(self.script.clone()))
        }
    }

    struct OneProvider(Arc<ScriptedProvider>);

    impl ProviderResolver for OneProvider {
        fn resolve(&self, _contact: &Contact) -> Result<Arc<dyn AgentProvider>, ProviderError> {
            Ok(self.0.clone())
        }

        fn capabilities(&self) -> Vec<ProviderCapability> {
            vec![self.0.capability()]
        }

        fn default_kind(&self) -> ProviderKind {
            ProviderKind::LocalCli
        }
    }

    #[derive(Default)]
    struct RecordingPush {
        sent: Mutex<Vec<(Vec<String>, PushNotification)>>,
        fail: bool,
    }

    #[async_trait]
    impl PushSender for RecordingPush {
        async fn send(&self, tokens: &[String], notification: &PushNotification) -> Result<(), DispatchError> {
            if self.fail {
                return Err(DispatchError::Push("HTTP 503: unavailable".into()));
            }
            self.sent.lock().push((tokens.to_vec(), notification.clone()));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Fixture {
        dispatcher: AsyncDispatcher,
        provider: Arc<ScriptedProvider>,
        push: Arc<RecordingPush>,
        tokens: Arc<InMemoryPushTokenStore>,
    }

    fn fixture(script: Vec<Result<StreamEvent, ProviderError>>, push: RecordingPush) -> Fixture {
        let provider = Arc::new(ScriptedProvider {
            script,
            prompts: Mutex::new(Vec::new()),
        });
        let push = Arc::new(push);
        let tokens = Arc::new(InMemoryPushTokenStore::new());
        let dispatcher = AsyncDispatcher::new(
            Arc::new(OneProvider(provider.clone())),
            tokens.clone(),
            Arc::new(InMemoryJobStore::new()),
            push.clone(),
        );
        Fixture {
            dispatcher,
            provider,
            push,
            tokens,
        }
    }

    fn answer(text: &str) -> Vec<Result<StreamEvent, ProviderError>> {
        vec![
            Ok(StreamEvent::message_start("m1", "t1")),
            Ok(StreamEvent::token(text)),
            Ok(StreamEvent::message_end("m1", text)),
        ]
    }

    fn contact() -> Contact {
        Contact::new("c1", "Helper", ProviderKind::LocalCli)
    }

    async fn register(store: &InMemoryPushTokenStore, token: &str) {
        store
            .register(PushRegistration {
                contact_id: "c1".into(),
                thread_id: "t1".into(),
                expo_push_token: token.into(),
                platform: "ios".into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_with_text_skips_provider() {
        let fx = fixture(answer("unused"), RecordingPush::default());
        register(&fx.tokens, "ExponentPushToken[a]").await;
        register(&fx.tokens, "ExponentPushToken[b]").await;

        let outcome = fx
            .dispatcher
            .trigger(&contact(), "t1", Some("  hello there "))
            .await
            .unwrap();

        assert_eq!(outcome.delivered_to, 2);
        assert_eq!(outcome.text, "  hello there ");
        assert!(fx.provider.prompts.lock().is_empty());

        let sent = fx.push.sent.lock();
        assert_eq!(sent[0].0.len(), 2);
        assert_eq!(sent[0].1.title, "Helper");
        assert_eq!(sent[0].1.body, "  hello there ");
        assert_eq!(sent[0].1.data["type"], "async_message");
    }

    #[tokio::test]
    async fn test_trigger_generates_filler() {
        let fx = fixture(answer("Any news on the report?"), RecordingPush::default());
        register(&fx.tokens, "ExponentPushToken[a]").await;

        let outcome = fx.dispatcher.trigger(&contact(), "t1", None).await.unwrap();

        assert_eq!(outcome.text, "Any news on the report?");
        assert_eq!(fx.provider.prompts.lock()[0].0, FILLER_PROMPT);
    }

    #[tokio::test]
    async fn test_filler_failure_uses_canned_sentence() {
        let fx = fixture(
            vec![
                Ok(StreamEvent::message_start("m1", "t1")),
                Err(ProviderError::Cli("boom".into())),
            ],
            RecordingPush::default(),
        );

        let outcome = fx.dispatcher.trigger(&contact(), "t1", Some("   ")).await.unwrap();
        assert_eq!(outcome.text, CANNED_FOLLOW_UP);
        assert_eq!(outcome.delivered_to, 0);
        assert!(fx.push.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_provider_uses_canned_sentence() {
        let tokens = Arc::new(InMemoryPushTokenStore::new());
        let push = Arc::new(RecordingPush::default());
        let dispatcher = AsyncDispatcher::new(
            Arc::new(ProviderRegistry::new(ProviderKind::Webhook)),
            tokens.clone(),
            Arc::new(InMemoryJobStore::new()),
            push.clone(),
        );
        register(&tokens, "ExponentPushToken[a]").await;

        let webhook = Contact::new("c1", "Helper", ProviderKind::Webhook);
        let outcome = dispatcher.trigger(&webhook, "t1", None).await.unwrap();

        assert_eq!(outcome.text, CANNED_FOLLOW_UP);
        assert_eq!(outcome.delivered_to, 1);
        assert_eq!(push.sent.lock()[0].1.body, CANNED_FOLLOW_UP);
    }

    #[tokio::test]
    async fn test_blank_filler_uses_canned_sentence() {
        let fx = fixture(answer("  "), RecordingPush::default());
        let outcome = fx.dispatcher.trigger(&contact(), "t1", None).await.unwrap();
        assert_eq!(outcome.text, CANNED_FOLLOW_UP);
    }

    #[tokio::test]
    async fn test_filler_sees_thread_history() {
        let fx = fixture(answer("ok"), RecordingPush::default());
        let history = Arc::new(InMemoryHistory::new());
        history.record(Message::user("t1", "earlier"));
        let dispatcher = fx.dispatcher.clone().with_history(history);

        dispatcher.trigger(&contact(), "t1", None).await.unwrap();
        assert_eq!(fx.provider.prompts.lock()[0].1, 1);
    }

    #[tokio::test]
    async fn test_push_failure_is_an_error() {
        let fx = fixture(
            answer("unused"),
            RecordingPush {
                fail: true,
                ..RecordingPush::default()
            },
        );
        register(&fx.tokens, "ExponentPushToken[a]").await;

        let result = fx.dispatcher.trigger(&contact(), "t1", Some("hi")).await;
        assert!(matches!(result, Err(DispatchError::Push(_))));
    }

    #[tokio::test]
    async fn test_schedule_rejects_bad_delay() {
        let fx = fixture(answer("x"), RecordingPush::default());
        for delay in [0, 3601] {
            let result = fx.dispatcher.schedule(&contact(), "t1", delay, None).await;
            assert!(matches!(result, Err(DispatchError::Invalid(_))));
        }
        assert!(fx.dispatcher.pending().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_and_clears_job() {
        let fx = fixture(answer("x"), RecordingPush::default());
        register(&fx.tokens, "ExponentPushToken[a]").await;

        let before = Utc::now();
        let receipt = fx
            .dispatcher
            .schedule(&contact(), "t1", 5, Some("later"))
            .await
            .unwrap();

        let lead = receipt.fire_at - before;
        assert!(lead >= chrono::Duration::seconds(5));
        assert!(lead < chrono::Duration::seconds(6));
        assert_eq!(fx.dispatcher.pending().await[0].job_id, receipt.job_id);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(fx.push.sent.lock().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fx.dispatcher.pending().await.is_empty());
        assert_eq!(fx.push.sent.lock()[0].1.body, "later");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_still_cleared() {
        let fx = fixture(
            answer("x"),
            RecordingPush {
                fail: true,
                ..RecordingPush::default()
            },
        );
        register(&fx.tokens, "ExponentPushToken[a]").await;

        fx.dispatcher
            .schedule(&contact(), "t1", 1, Some("later"))
            .await
            .unwrap();
        assert_eq!(fx.dispatcher.pending().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fx.dispatcher.pending().await.is_empty());
    }
}
