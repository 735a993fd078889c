//! Server-Sent Events transport for [`StreamEvent`]s
//!
//! Each event travels as one `data: <json>\n\n` frame; a successful stream
//! ends with `data: [DONE]\n\n`.
//!
//! [`StreamEvent`]: parley_foundation::StreamEvent

mod decode;
mod encode;

pub use decode::{decode_stream, SseDecoder};
pub use encode::{done_frame, encode_event, encode_stream, ERROR_CODE};

/// Sentinel payload that marks the end of a successful stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Content type of SSE response bodies
pub const CONTENT_TYPE: &str = "text/event-stream";
