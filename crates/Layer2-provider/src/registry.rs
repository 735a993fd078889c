//! Provider registry and wrapped-command routing

use crate::{
    error::ProviderError,
    providers::{CliProvider, OpenAiProvider, RemoteFlavor, RemoteHttpProvider},
    r#trait::{AgentProvider, ProviderResolver},
};
use parley_foundation::{Contact, HostedModelConfig, ProviderCapability, ProviderKind, WrappedCommand};
use parley_task::Executor;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

/// One adapter per provider kind, kept in registration order
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AgentProvider>>,
    default_kind: ProviderKind,
}

impl ProviderRegistry {
    pub fn new(default_kind: ProviderKind) -> Self {
        Self {
            providers: Vec::new(),
            default_kind,
        }
    }

    /// Registry with every built-in adapter
    pub fn with_defaults(
        default_kind: ProviderKind,
        hosted: HostedModelConfig,
        client: Client,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let mut registry = Self::new(default_kind);
        registry.register(Arc::new(OpenAiProvider::with_client(client.clone(), hosted)));
        registry.register(Arc::new(RemoteHttpProvider::with_client(
            client.clone(),
            RemoteFlavor::Agent,
        )));
        registry.register(Arc::new(RemoteHttpProvider::with_client(
            client,
            RemoteFlavor::Webhook,
        )));
        for kind in [
            ProviderKind::ClaudeCli,
            ProviderKind::CodexCli,
            ProviderKind::LocalCli,
        ] {
            registry.register(Arc::new(CliProvider::new(kind, Arc::clone(&executor))));
        }
        registry
    }

    /// Add an adapter; an existing adapter of the same kind is replaced in place
    pub fn register(&mut self, provider: Arc<dyn AgentProvider>) {
        let kind = provider.kind();
        match self.providers.iter_mut().find(|p| p.kind() == kind) {
            Some(slot) => {
                debug!("Replacing provider: {}", kind);
                *slot = provider;
            }
            None => {
                debug!("Registering provider: {}", kind);
                self.providers.push(provider);
            }
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn AgentProvider>, ProviderError> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .cloned()
            .ok_or(ProviderError::Unregistered(kind))
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ProviderResolver for ProviderRegistry {
    fn resolve(&self, contact: &Contact) -> Result<Arc<dyn AgentProvider>, ProviderError> {
        self.get(contact.provider.kind)
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        self.providers.iter().map(|p| p.capability()).collect()
    }

    fn default_kind(&self) -> ProviderKind {
        self.default_kind
    }
}

/// Wrapped-command mode: every contact is answered by one fixed command
pub struct WrappedRoute {
    provider: Arc<CliProvider>,
}

impl WrappedRoute {
    pub fn new(command: &WrappedCommand, executor: Arc<dyn Executor>) -> Self {
        let provider = CliProvider::wrapped(command, executor);
        info!(
            "Wrapped mode: routing every contact to '{}' as {}",
            command.command,
            provider.kind()
        );
        Self {
            provider: Arc::new(provider),
        }
    }
}

impl ProviderResolver for WrappedRoute {
    fn resolve(&self, _contact: &Contact) -> Result<Arc<dyn AgentProvider>, ProviderError> {
        Ok(self.provider.clone())
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        vec![self.provider.capability()]
    }

    fn default_kind(&self) -> ProviderKind {
        self.provider.kind()
    }
}
