//! In-memory stores

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use super::{HistoryLookup, JobStore, PushTokenStore, ScheduledJob};
use crate::api::PushRegistration;
use crate::core::Message;
use crate::error::Result;

type TokenKey = (String, String);

/// Push tokens held in process memory
#[derive(Debug, Default)]
pub struct InMemoryPushTokenStore {
    tokens: RwLock<HashMap<TokenKey, Vec<String>>>,
}

impl InMemoryPushTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PushTokenStore for InMemoryPushTokenStore {
    async fn register(&self, registration: PushRegistration) -> Result<()> {
        registration.validate()?;

        let key = (registration.contact_id, registration.thread_id);
        let mut tokens = self.tokens.write();
        let entry = tokens.entry(key).or_default();
        if !entry.contains(&registration.expo_push_token) {
            debug!(platform = %registration.platform, "Registered push token");
            entry.push(registration.expo_push_token);
        }
        Ok(())
    }

    async fn tokens_for(&self, contact_id: &str, thread_id: &str) -> Vec<String> {
        self.tokens
            .read()
            .get(&(contact_id.to_string(), thread_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    async fn clear(&self) {
        self.tokens.write().clear();
    }
}

/// Scheduled jobs held in process memory
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, ScheduledJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: ScheduledJob) {
        self.jobs.write().insert(job.job_id.clone(), job);
    }

    async fn remove(&self, job_id: &str) -> bool {
        self.jobs.write().remove(job_id).is_some()
    }

    async fn contains(&self, job_id: &str) -> bool {
        self.jobs.read().contains_key(job_id)
    }

    async fn pending(&self) -> Vec<ScheduledJob> {
        let mut jobs: Vec<ScheduledJob> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|job| job.fire_at);
        jobs
    }

    async fn clear(&self) {
        self.jobs.write().clear();
    }
}

/// Thread history held in process memory
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to its thread
    pub fn record(&self, message: Message) {
        self.threads
            .write()
            .entry(message.thread_id.clone())
            .or_default()
            .push(message);
    }
}

#[async_trait]
impl HistoryLookup for InMemoryHistory {
    async fn history(&self, thread_id: &str) -> Vec<Message> {
        self.threads
            .read()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }
}
