//! # parley-provider
//!
//! Agent provider abstraction layer for Parley.
//! Every provider kind answers a chat turn as one ordered stream of
//! canonical events.
//!
//! ## Features
//! - Hosted model, remote HTTP agent and local CLI adapters
//! - Output normalization for CLI answers
//! - SSE encoding/decoding of the event stream
//! - Provider registry, wrapped-command routing and client-side discovery

pub mod client;
pub mod error;
pub mod normalize;
pub mod providers;
pub mod registry;
pub mod sse;
pub mod r#trait;
pub mod turn;

// Core traits and types
pub use r#trait::{AgentProvider, ChatTurn, EventStream, ProviderResolver};

// Error
pub use error::ProviderError;

// Provider implementations
pub use providers::cli::CliProvider;
pub use providers::openai::OpenAiProvider;
pub use providers::remote::{RemoteFlavor, RemoteHttpProvider};
pub use providers::{capability_for, http_client, prompt_text};

// Routing
pub use registry::{ProviderRegistry, WrappedRoute};

// Transport
pub use client::{choose_kind, final_text, ParleyClient};
pub use normalize::{line_tokens, normalize_output};
pub use sse::{decode_stream, encode_stream, SseDecoder};
pub use turn::TurnSealer;
