//! Domain-facing types the streaming client hands to the Turn Aggregator.
//!
//! These are a thin, already-decoded layer over the wire format (`wire.rs`):
//! no session/backoff/connection concerns leak through, only the content a
//! consumer needs to build the per-utterance model.

use crate::wire::WireWord;

/// One word as reported by the speech service for the current turn.
/// Timestamps are optional — consumers must tolerate `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnWord {
    pub text: String,
    pub is_final: bool,
    pub start_ms: Option<u32>,
    pub end_ms: Option<u32>,
}

impl From<WireWord> for TurnWord {
    fn from(w: WireWord) -> Self {
        Self {
            text: w.text,
            is_final: w.word_is_final,
            start_ms: w.start,
            end_ms: w.end,
        }
    }
}

/// A decoded inbound message, forwarded from the client to the Turn
/// Aggregator in receipt order.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Begin {
        session_id: String,
    },
    Turn {
        transcript: String,
        words: Vec<TurnWord>,
        end_of_turn: bool,
        turn_is_formatted: bool,
    },
    Termination,
    Error {
        code: Option<String>,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_word_converts_final_flag_and_timestamps() {
        let w = WireWord {
            text: "copy".to_string(),
            start: Some(100),
            end: Some(250),
            word_is_final: true,
        };
        let tw: TurnWord = w.into();
        assert_eq!(tw.text, "copy");
        assert!(tw.is_final);
        assert_eq!(tw.start_ms, Some(100));
        assert_eq!(tw.end_ms, Some(250));
    }

    #[test]
    fn wire_word_tolerates_missing_timestamps() {
        let w = WireWord {
            text: "that".to_string(),
            start: None,
            end: None,
            word_is_final: false,
        };
        let tw: TurnWord = w.into();
        assert!(!tw.is_final);
        assert_eq!(tw.start_ms, None);
        assert_eq!(tw.end_ms, None);
    }
}
