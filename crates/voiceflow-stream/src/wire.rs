//! JSON wire format for the speech-service streaming protocol (AssemblyAI
//! Streaming v3). Only the fields the engine cares about are modeled;
//! everything else is dropped on deserialization.

use serde::Deserialize;

/// One inbound message, tagged on the `type` field.
///
/// `#[serde(other)]` catches message types the service adds later; those
/// decode as `Unknown` rather than failing, per the tolerate-unknown-fields
/// requirement on the inbound contract.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Begin {
        id: String,
        #[serde(default)]
        expires_at: Option<u64>,
    },
    Turn {
        transcript: String,
        #[serde(default)]
        words: Vec<WireWord>,
        end_of_turn: bool,
        #[serde(default)]
        turn_is_formatted: bool,
    },
    Termination {
        #[serde(default)]
        audio_duration_seconds: Option<f32>,
        #[serde(default)]
        session_duration_seconds: Option<f32>,
    },
    Error {
        #[serde(default)]
        code: Option<String>,
        #[serde(default, alias = "error")]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct WireWord {
    pub text: String,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub end: Option<u32>,
    #[serde(default)]
    pub word_is_final: bool,
}

/// Decode one inbound text frame. Malformed JSON is the caller's problem to
/// log-and-drop, not this function's — it just reports the parse failure.
pub fn decode(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Build the outbound query string for the connect URL. The API key is
/// carried as a header, not a query parameter, so it never ends up in logs
/// that capture the URL.
pub fn stream_url(base: &str, sample_rate_hz: u32) -> String {
    format!(
        "{}?sample_rate={}&format_turns=true",
        base.trim_end_matches('/'),
        sample_rate_hz
    )
}

pub const DEFAULT_ENDPOINT: &str = "wss://streaming.assemblyai.com/v3/ws";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_begin() {
        let msg = decode(r#"{"type":"Begin","id":"abc123","expires_at":1700000000}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Begin { id, .. } if id == "abc123"));
    }

    #[test]
    fn decodes_turn_with_words() {
        let msg = decode(
            r#"{"type":"Turn","transcript":"tab back","words":[{"text":"tab","word_is_final":true},{"text":"back","word_is_final":false}],"end_of_turn":false,"turn_is_formatted":false}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::Turn {
                transcript,
                words,
                end_of_turn,
                turn_is_formatted,
            } => {
                assert_eq!(transcript, "tab back");
                assert_eq!(words.len(), 2);
                assert!(!end_of_turn);
                assert!(!turn_is_formatted);
            }
            other => panic!("expected Turn, got {other:?}"),
        }
    }

    #[test]
    fn decodes_error() {
        let msg = decode(r#"{"type":"Error","error":"bad sample rate"}"#).unwrap();
        match msg {
            ServerMessage::Error { message, .. } => assert_eq!(message, "bad sample rate"),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_does_not_fail() {
        let msg = decode(r#"{"type":"SomethingNew","stuff":1}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Unknown));
    }

    #[test]
    fn malformed_json_is_an_error_not_a_panic() {
        assert!(decode("not json").is_err());
    }

    #[test]
    fn stream_url_carries_sample_rate_and_format_turns() {
        let url = stream_url(DEFAULT_ENDPOINT, 16_000);
        assert_eq!(
            url,
            "wss://streaming.assemblyai.com/v3/ws?sample_rate=16000&format_turns=true"
        );
    }
}
