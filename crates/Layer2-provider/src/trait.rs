//! Provider trait and common types

use crate::error::ProviderError;
use futures::Stream;
use parley_foundation::{Contact, Message, ProviderCapability, ProviderKind, StreamEvent};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;

/// Stream of canonical events for one turn
///
/// `Err` items end the turn; the SSE encoder writes them as one terminal
/// `error` event.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderError>> + Send>>;

/// Everything an adapter needs to answer one outbound message
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub contact: Contact,
    pub thread_id: String,
    pub message: Message,
    pub history: Vec<Message>,
    pub metadata: Option<Value>,
}

impl ChatTurn {
    pub fn new(contact: Contact, thread_id: impl Into<String>, message: Message) -> Self {
        Self {
            contact,
            thread_id: thread_id.into(),
            message,
            history: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Adapter for one provider kind
///
/// Implementations must open every stream with `message_start` and close it
/// with exactly one `message_end` or error. Inputs are borrowed and never
/// mutated; the returned stream owns whatever it needs.
pub trait AgentProvider: Send + Sync {
    /// Kind this adapter serves
    fn kind(&self) -> ProviderKind;

    /// Static capability descriptor
    fn capability(&self) -> ProviderCapability;

    /// Start answering `turn`
    fn send_message_stream(&self, turn: &ChatTurn) -> EventStream;
}

/// Picks the adapter that answers a contact
///
/// The registry resolves by the contact's kind; wrapped-command mode answers
/// every contact with the same adapter.
pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, contact: &Contact) -> Result<Arc<dyn AgentProvider>, ProviderError>;

    /// Capabilities in registration order
    fn capabilities(&self) -> Vec<ProviderCapability>;

    /// Kind reported to clients as the server default
    fn default_kind(&self) -> ProviderKind;
}
