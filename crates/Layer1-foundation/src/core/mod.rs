//! Core Module - data model and turn contract
//!
//! - `types.rs`: contacts, messages, attachments, stream events, capabilities
//! - `turn.rs`: ordering contract for one chat turn

mod turn;
mod types;

pub use turn::{validate_turn, TurnViolation};
pub use types::{
    Attachment, AttachmentKind, AuthConfig, Contact, ContactProvider, Message, MessageRole,
    MessageStatus, ProviderCapability, ProviderKind, StreamEvent,
};
