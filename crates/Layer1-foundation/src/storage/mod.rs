//! Storage module for Parley
//!
//! Injected store abstractions with an explicit create/clear lifecycle:
//! - `PushTokenStore`: push tokens keyed by `(contactId, threadId)`
//! - `JobStore`: pending scheduled async jobs
//! - `HistoryLookup`: read-only thread history for adapters
//!
//! `memory` provides the in-process implementations. Nothing here survives a
//! restart.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::PushRegistration;
use crate::core::Message;
use crate::error::Result;

pub use memory::{InMemoryHistory, InMemoryJobStore, InMemoryPushTokenStore};

/// A scheduled job waiting for its timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub job_id: String,
    pub contact_id: String,
    pub thread_id: String,
    pub fire_at: DateTime<Utc>,
}

/// Push delivery tokens
#[async_trait]
pub trait PushTokenStore: Send + Sync {
    /// Remember a token for `(contactId, threadId)`; re-registering is a no-op
    async fn register(&self, registration: PushRegistration) -> Result<()>;

    /// Tokens registered for `(contactId, threadId)`, in registration order
    async fn tokens_for(&self, contact_id: &str, thread_id: &str) -> Vec<String>;

    /// Drop every token
    async fn clear(&self);
}

/// Pending scheduled jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: ScheduledJob);

    /// Returns whether the job was still pending
    async fn remove(&self, job_id: &str) -> bool;

    async fn contains(&self, job_id: &str) -> bool;

    async fn pending(&self) -> Vec<ScheduledJob>;

    async fn clear(&self);
}

/// Thread history provider
#[async_trait]
pub trait HistoryLookup: Send + Sync {
    /// Messages of the thread, oldest first
    async fn history(&self, thread_id: &str) -> Vec<Message>;
}
