//! # parley-foundation
//!
//! Foundation layer for Parley:
//! - Core: contacts, messages, the stream event protocol and its turn contract
//! - Api: request/response bodies and route paths of the HTTP surface
//! - Config: server configuration (defaults + environment)
//! - Storage: injected stores for push tokens, scheduled jobs and history
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Layer4-server   axum routes, SSE response bodies        │
//! │        │                                                 │
//! │  Layer3-dispatch async trigger / schedule, push          │
//! │        │                                                 │
//! │  Layer2-provider adapters, registry, SSE codec           │
//! │        │                                                 │
//! │  Layer2-task     CLI process wrapper                     │
//! │        │                                                 │
//! │  Layer1-foundation  (this crate)                         │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core
// ============================================================================
pub use core::{
    validate_turn, Attachment, AttachmentKind, AuthConfig, Contact, ContactProvider, Message,
    MessageRole, MessageStatus, ProviderCapability, ProviderKind, StreamEvent, TurnViolation,
};

// ============================================================================
// Config
// ============================================================================
pub use config::{HostedModelConfig, PushConfig, ServerConfig, WrappedCommand};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{
    HistoryLookup, InMemoryHistory, InMemoryJobStore, InMemoryPushTokenStore, JobStore,
    PushTokenStore, ScheduledJob,
};
