use bytes::Bytes;
use futures::{Stream, StreamExt};
use parley_foundation::StreamEvent;
use std::convert::Infallible;
use tracing::warn;

use super::DONE_SENTINEL;
use crate::r#trait::EventStream;

/// Code carried by the error event written for a failed stream
pub const ERROR_CODE: &str = "provider_error";

/// One `data:` frame
pub fn encode_event(event: &StreamEvent) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("data: {}\n\n", json)))
}

/// Terminator of a successful stream
pub fn done_frame() -> Bytes {
    Bytes::from(format!("data: {}\n\n", DONE_SENTINEL))
}

fn error_frame(message: String) -> Bytes {
    let event = StreamEvent::error(ERROR_CODE, message, false);
    encode_event(&event).unwrap_or_else(|_| {
        Bytes::from_static(b"data: {\"type\":\"error\",\"code\":\"provider_error\",\"message\":\"stream failed\",\"retryable\":false}\n\n")
    })
}

/// Frame a provider stream as an SSE body
///
/// A failure becomes one `error` frame and ends the body without `[DONE]`;
/// so does an `error` event emitted by the provider itself.
/// Dropping the returned stream drops the provider stream with it.
pub fn encode_stream(events: EventStream) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    async_stream::stream! {
        let mut events = events;
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => match encode_event(&event) {
                    Ok(frame) => {
                        yield Ok(frame);
                        if matches!(event, StreamEvent::Error { .. }) {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to serialize {} event: {}", event.type_name(), e);
                        yield Ok(error_frame(e.to_string()));
                        return;
                    }
                },
                Err(e) => {
                    warn!("Provider stream failed: {}", e);
                    yield Ok(error_frame(e.to_string()));
                    return;
                }
            }
        }
        yield Ok(done_frame());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use futures::stream;

    async fn collect_body(events: Vec<Result<StreamEvent, ProviderError>>) -> String {
        let frames: Vec<Bytes> = encode_stream(Box::pin(stream::iter(events)))
            .map(|frame| match frame {
                Ok(bytes) => bytes,
                Err(never) => match never {},
            })
            .collect()
            .await;
        frames
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    #[test]
    fn test_frame_shape() {
        let frame = encode_event(&StreamEvent::token("hi")).unwrap();
        assert_eq!(&frame[..], b"data: {\"type\":\"token\",\"text\":\"hi\"}\n\n");
        assert_eq!(&done_frame()[..], b"data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_success_ends_with_done() {
        let body = collect_body(vec![
            Ok(StreamEvent::message_start("m1", "t1")),
            Ok(StreamEvent::token("hi")),
            Ok(StreamEvent::message_end("m1", "hi")),
        ])
        .await;

        assert_eq!(body.matches("data: ").count(), 4);
        assert!(body.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_failure_writes_single_error_without_done() {
        let body = collect_body(vec![
            Ok(StreamEvent::message_start("m1", "t1")),
            Err(ProviderError::Cli("boom".into())),
            Ok(StreamEvent::token("never sent")),
        ])
        .await;

        assert!(!body.contains("[DONE]"));
        assert!(!body.contains("never sent"));
        assert!(body.ends_with(
            "data: {\"type\":\"error\",\"code\":\"provider_error\",\"message\":\"boom\",\"retryable\":false}\n\n"
        ));
    }

    #[tokio::test]
    async fn test_emitted_error_event_ends_body_without_done() {
        let body = collect_body(vec![
            Ok(StreamEvent::message_start("m1", "t1")),
            Ok(StreamEvent::error("agent_down", "upstream unavailable", true)),
        ])
        .await;

        assert_eq!(body.matches("data: ").count(), 2);
        assert!(!body.contains("[DONE]"));
        assert!(body.ends_with(
            "data: {\"type\":\"error\",\"code\":\"agent_down\",\"message\":\"upstream unavailable\",\"retryable\":true}\n\n"
        ));
    }
}
