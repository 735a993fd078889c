//! Shared application state

use parley_dispatch::{sender_from_config, AsyncDispatcher, PushSender};
use parley_foundation::{
    HistoryLookup, InMemoryHistory, InMemoryJobStore, InMemoryPushTokenStore, JobStore,
    PushTokenStore, ServerConfig,
};
use parley_provider::{http_client, ProviderRegistry, ProviderResolver, WrappedRoute};
use parley_task::{Executor, LocalExecutor};
use std::sync::Arc;
use tracing::info;

/// Everything the handlers share
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn ProviderResolver>,
    pub push_tokens: Arc<dyn PushTokenStore>,
    pub history: Arc<dyn HistoryLookup>,
    pub dispatcher: AsyncDispatcher,
}

impl AppState {
    /// Wire explicit collaborators together
    pub fn new(
        resolver: Arc<dyn ProviderResolver>,
        push_tokens: Arc<dyn PushTokenStore>,
        jobs: Arc<dyn JobStore>,
        push: Arc<dyn PushSender>,
        history: Arc<dyn HistoryLookup>,
    ) -> Self {
        let dispatcher = AsyncDispatcher::new(resolver.clone(), push_tokens.clone(), jobs, push)
            .with_history(history.clone());
        Self {
            resolver,
            push_tokens,
            history,
            dispatcher,
        }
    }

    /// Production wiring: in-memory stores, local executor, configured push
    pub fn from_config(config: &ServerConfig) -> Self {
        let client = http_client();
        let executor: Arc<dyn Executor> = Arc::new(LocalExecutor::new());

        let resolver: Arc<dyn ProviderResolver> = match &config.wrapped {
            Some(command) => Arc::new(WrappedRoute::new(command, executor)),
            None => {
                let registry = ProviderRegistry::with_defaults(
                    config.default_kind,
                    config.hosted.clone(),
                    client.clone(),
                    executor,
                );
                info!("Registered providers: {:?}", registry.kinds());
                Arc::new(registry)
            }
        };

        Self::new(
            resolver,
            Arc::new(InMemoryPushTokenStore::new()),
            Arc::new(InMemoryJobStore::new()),
            sender_from_config(&config.push, client),
            Arc::new(InMemoryHistory::new()),
        )
    }
}
