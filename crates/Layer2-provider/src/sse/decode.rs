use futures::{Stream, StreamExt};
use parley_foundation::StreamEvent;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Display;

use super::DONE_SENTINEL;
use crate::error::ProviderError;
use crate::r#trait::EventStream;

/// Incremental SSE frame decoder
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence or a
/// `\r\n` pair; only complete frames are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the events of every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        // A '\r' left at the end of the previous chunk may pair with this one
        let rescan_from = self.buffer.len().saturating_sub(1);
        self.buffer.extend_from_slice(chunk);
        strip_crlf(&mut self.buffer, rescan_from);

        let mut events = Vec::new();
        while let Some(end) = find_boundary(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            decode_frame(&frame[..end], &mut events);
        }
        events
    }

    /// Decode whatever is left once the input has ended
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        if !rest.is_empty() {
            decode_frame(&rest, &mut events);
        }
        events
    }
}

/// Decode an SSE byte stream into events
pub fn decode_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for event in decoder.push(chunk.as_ref()) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(ProviderError::StreamError(format!("Stream read error: {}", e)));
                    return;
                }
            }
        }

        for event in decoder.finish() {
            yield Ok(event);
        }
    })
}

/// Decode one `data:` payload; `None` for the done sentinel
pub(crate) fn decode_payload(payload: &str) -> Option<StreamEvent> {
    if payload == DONE_SENTINEL {
        return None;
    }

    let value = match serde_json::from_str::<Value>(payload) {
        Ok(value) => value,
        Err(_) => return Some(StreamEvent::token(payload)),
    };

    if let Ok(event) = StreamEvent::deserialize(&value) {
        return Some(event);
    }

    let loose = ["text", "token"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str));

    Some(match loose {
        Some(text) => StreamEvent::token(text),
        None => StreamEvent::token(payload),
    })
}

fn decode_frame(frame: &[u8], events: &mut Vec<StreamEvent>) {
    let text = String::from_utf8_lossy(frame);
    for line in text.split('\n') {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = data.trim();
        if payload.is_empty() {
            continue;
        }
        if let Some(event) = decode_payload(payload) {
            events.push(event);
        }
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Rewrite `\r\n` as `\n` from `start` on
fn strip_crlf(buffer: &mut Vec<u8>, start: usize) {
    if !buffer[start..].windows(2).any(|w| w == b"\r\n") {
        return;
    }

    let mut out = Vec::with_capacity(buffer.len());
    out.extend_from_slice(&buffer[..start]);
    let tail = &buffer[start..];
    for (i, byte) in tail.iter().enumerate() {
        if *byte == b'\r' && tail.get(i + 1) == Some(&b'\n') {
            continue;
        }
        out.push(*byte);
    }
    *buffer = out;
}
