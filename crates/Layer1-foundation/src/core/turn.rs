//! Turn ordering contract
//!
//! One `message_start`, then any number of `token` / `attachment` / `typing`
//! events, then exactly one of `message_end` / `error`.

use super::types::StreamEvent;
use thiserror::Error;

/// Why an event sequence breaks the turn contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnViolation {
    #[error("empty event sequence")]
    Empty,

    #[error("sequence must open with message_start, found {0}")]
    MissingStart(&'static str),

    #[error("{kind} at index {index} is outside the turn")]
    OutsideTurn { index: usize, kind: &'static str },

    #[error("sequence is not closed by message_end or error")]
    MissingTerminal,

    #[error("message_end id {end} does not match message_start id {start}")]
    MessageIdMismatch { start: String, end: String },

    #[error("typing(true) at index {0} after typing(false)")]
    TypingReopened(usize),
}

/// Check a complete turn against the ordering contract
pub fn validate_turn(events: &[StreamEvent]) -> Result<(), TurnViolation> {
    let (first, rest) = events.split_first().ok_or(TurnViolation::Empty)?;

    let start_id = match first {
        StreamEvent::MessageStart { message_id, .. } => message_id,
        other => return Err(TurnViolation::MissingStart(other.type_name())),
    };

    let mut typing_closed = false;

    for (offset, event) in rest.iter().enumerate() {
        let index = offset + 1;
        let is_last = index == events.len() - 1;

        match event {
            StreamEvent::MessageStart { .. } => {
                return Err(TurnViolation::OutsideTurn {
                    index,
                    kind: event.type_name(),
                });
            }
            StreamEvent::Typing { is_typing } => {
                if *is_typing && typing_closed {
                    return Err(TurnViolation::TypingReopened(index));
                }
                if !*is_typing {
                    typing_closed = true;
                }
            }
            StreamEvent::MessageEnd { message_id, .. } => {
                if !is_last {
                    return Err(TurnViolation::OutsideTurn {
                        index: index + 1,
                        kind: events[index + 1].type_name(),
                    });
                }
                if message_id != start_id {
                    return Err(TurnViolation::MessageIdMismatch {
                        start: start_id.clone(),
                        end: message_id.clone(),
                    });
                }
            }
            StreamEvent::Error { .. } => {
                if !is_last {
                    return Err(TurnViolation::OutsideTurn {
                        index: index + 1,
                        kind: events[index + 1].type_name(),
                    });
                }
            }
            StreamEvent::Token { .. } | StreamEvent::Attachment { .. } => {}
        }
    }

    match events.last() {
        Some(last) if last.is_terminal() && events.len() > 1 => Ok(()),
        _ => Err(TurnViolation::MissingTerminal),
    }
}
