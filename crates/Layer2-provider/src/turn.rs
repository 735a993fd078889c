//! Keeps re-emitted remote streams inside the turn contract
//!
//! The adapter opens the turn itself, so a remote `message_start` is a
//! duplicate and is dropped. Anything after a terminal event is dropped. A
//! remote `message_end` is rewritten to carry the opening message id, and a
//! stream that ends without one gets a synthesized `message_end` holding the
//! accumulated token text. Typing is not reopened once it has stopped.

use parley_foundation::StreamEvent;
use tracing::debug;

#[derive(Debug)]
pub struct TurnSealer {
    message_id: String,
    text: String,
    typing: bool,
    typing_closed: bool,
    closed: bool,
}

impl TurnSealer {
    /// Sealer for a turn already opened with `message_id`
    pub fn opened(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            text: String::new(),
            typing: false,
            typing_closed: false,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Pass one remote event through; `None` when it is dropped
    pub fn accept(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        if self.closed {
            debug!("Dropping {} after end of turn", event.type_name());
            return None;
        }

        match event {
            StreamEvent::MessageStart { .. } => {
                debug!("Dropping duplicate message_start");
                None
            }
            StreamEvent::Token { text } => {
                self.text.push_str(&text);
                Some(StreamEvent::Token { text })
            }
            StreamEvent::Typing { is_typing } => {
                if is_typing && self.typing_closed {
                    debug!("Dropping typing(true) after typing(false)");
                    return None;
                }
                self.typing = is_typing;
                self.typing_closed |= !is_typing;
                Some(StreamEvent::Typing { is_typing })
            }
            StreamEvent::MessageEnd {
                text,
                status,
                created_at,
                ..
            } => {
                self.closed = true;
                Some(StreamEvent::MessageEnd {
                    message_id: self.message_id.clone(),
                    text,
                    status,
                    created_at,
                })
            }
            error @ StreamEvent::Error { .. } => {
                self.closed = true;
                Some(error)
            }
            other => Some(other),
        }
    }

    /// Events needed to close a turn the remote left open
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;

        let mut events = Vec::new();
        if self.typing {
            self.typing = false;
            events.push(StreamEvent::typing(false));
        }
        events.push(StreamEvent::message_end(
            self.message_id.clone(),
            std::mem::take(&mut self.text),
        ));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_foundation::validate_turn;

    fn run(remote: Vec<StreamEvent>) -> Vec<StreamEvent> {
        let mut sealer = TurnSealer::opened("ours");
        let mut out = vec![StreamEvent::message_start("ours", "t1")];
        out.extend(remote.into_iter().filter_map(|e| sealer.accept(e)));
        out.extend(sealer.finish());
        out
    }

    #[test]
    fn test_synthesizes_end_from_tokens() {
        let out = run(vec![
            StreamEvent::typing(true),
            StreamEvent::token("Hel"),
            StreamEvent::token("lo"),
        ]);
        assert!(validate_turn(&out).is_ok());
        assert_eq!(out[out.len() - 2], StreamEvent::typing(false));
        match out.last() {
            Some(StreamEvent::MessageEnd { message_id, text, .. }) => {
                assert_eq!(message_id, "ours");
                assert_eq!(text, "Hello");
            }
            other => panic!("unexpected tail: {:?}", other),
        }
    }

    #[test]
    fn test_rewrites_remote_end_and_drops_extras() {
        let out = run(vec![
            StreamEvent::message_start("theirs", "t1"),
            StreamEvent::token("a"),
            StreamEvent::message_end("theirs", "a"),
            StreamEvent::token("late"),
            StreamEvent::message_end("theirs", "again"),
        ]);
        assert!(validate_turn(&out).is_ok());
        assert_eq!(out.len(), 3);
        assert!(matches!(
            &out[2],
            StreamEvent::MessageEnd { message_id, .. } if message_id == "ours"
        ));
    }

    #[test]
    fn test_remote_error_closes_turn() {
        let out = run(vec![
            StreamEvent::error("upstream", "down", true),
            StreamEvent::token("ignored"),
        ]);
        assert!(validate_turn(&out).is_ok());
        assert_eq!(out.len(), 2);
    }
}
