//! # parley-dispatch
//!
//! Out-of-band agent messages: the dispatcher asks a provider for text (or
//! takes it from the caller) and delivers it through push, immediately or
//! on a timer.

pub mod dispatcher;
pub mod error;
pub mod push;

pub use dispatcher::{AsyncDispatcher, CANNED_FOLLOW_UP, FILLER_PROMPT};
pub use error::DispatchError;
pub use push::{
    sender_from_config, ExpoPushSender, LogPushSender, PushNotification, PushSender,
    ASYNC_MESSAGE_TYPE,
};
