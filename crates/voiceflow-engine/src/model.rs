//! Core data model: operating mode, command definitions, and the
//! per-utterance state the engine tracks while a session is open.

use std::collections::HashSet;
use std::time::Instant;

pub use voiceflow_stream::TurnWord;
pub use voiceflow_text_injection::{KeyChord, KeyCode, Modifier};

/// The engine's global operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Audio may still be captured but no downstream action is taken.
    Off,
    /// Finalized text is injected as keystrokes; command matching disabled.
    Dictation,
    /// Command matching is enabled; finalized text is never injected.
    Wake,
}

/// What firing a command does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    KeySequence(KeyChord),
    ModeSet(Mode),
    Quit,
    /// Reserved; not wired to any behavior in V1.
    CancelLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    System,
    User,
}

/// An immutable, user- or system-defined voice command. The command set is
/// replaced wholesale on settings reload; individual entries are never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandDefinition {
    /// Already lowercase and whitespace-normalized at construction.
    pub phrase: String,
    pub action: Action,
    pub category: CommandCategory,
}

impl CommandDefinition {
    /// Build a definition, normalizing `phrase` the same way the matcher
    /// normalizes hypotheses, so matching never has to re-normalize it.
    pub fn new(
        phrase: &str,
        action: Action,
        category: CommandCategory,
    ) -> Result<Self, voiceflow_foundation::error::ConfigError> {
        let normalized = crate::commands::normalize(phrase);
        if normalized.is_empty() {
            return Err(voiceflow_foundation::error::ConfigError::InvalidCommandPhrase(
                phrase.to_string(),
            ));
        }
        Ok(Self {
            phrase: normalized,
            action,
            category,
        })
    }

    pub fn is_system(&self) -> bool {
        matches!(self.category, CommandCategory::System)
    }

    /// System commands that change mode or quit are always active,
    /// regardless of the current Mode.
    pub fn always_active(&self) -> bool {
        self.is_system() && matches!(self.action, Action::ModeSet(_) | Action::Quit)
    }
}

/// The cumulative state of the currently-open utterance, as of the most
/// recently received inbound Turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub transcript: String,
    pub words: Vec<TurnWord>,
    pub end_of_turn: bool,
    pub turn_is_formatted: bool,
    pub received_at: Instant,
}

/// The per-utterance scratchpad the engine maintains while one utterance
/// is open, and which is discarded once it terminates.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub id: u64,
    pub turn: Turn,
    pub executed_commands: HashSet<String>,
    pub consumed_by_command: bool,
    pub formatted_text: Option<String>,
    pub unformatted_final_text: Option<String>,
}

impl Utterance {
    pub fn new(id: u64, turn: Turn) -> Self {
        Self {
            id,
            turn,
            executed_commands: HashSet::new(),
            consumed_by_command: false,
            formatted_text: None,
            unformatted_final_text: None,
        }
    }

    /// The live hypothesis: final words followed by non-final words,
    /// whitespace-normalized and lowercased.
    pub fn hypothesis(&self) -> String {
        let joined = self
            .turn
            .words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        crate::commands::normalize(&joined)
    }

    /// The best available final text once the utterance has ended:
    /// formatted text if present, else the unformatted final transcript.
    pub fn best_final_text(&self) -> Option<&str> {
        self.formatted_text
            .as_deref()
            .or(self.unformatted_final_text.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub connection_state: ConnectionState,
    pub current_utterance: Option<Utterance>,
    pub last_activity: Instant,
}

impl Session {
    pub fn new(now: Instant) -> Self {
        Self {
            connection_state: ConnectionState::Disconnected,
            current_utterance: None,
            last_activity: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_normalizes_phrase() {
        let cmd = CommandDefinition::new(
            "  Copy   That  ",
            Action::KeySequence(KeyChord::new([Modifier::Cmd], KeyCode::Char('c'))),
            CommandCategory::User,
        )
        .unwrap();
        assert_eq!(cmd.phrase, "copy that");
    }

    #[test]
    fn empty_phrase_is_rejected() {
        let err = CommandDefinition::new(
            "   ",
            Action::Quit,
            CommandCategory::System,
        );
        assert!(err.is_err());
    }

    #[test]
    fn always_active_only_for_system_mode_or_quit_commands() {
        let mode_set = CommandDefinition::new(
            "microphone on",
            Action::ModeSet(Mode::Dictation),
            CommandCategory::System,
        )
        .unwrap();
        assert!(mode_set.always_active());

        let user_cmd = CommandDefinition::new(
            "copy that",
            Action::KeySequence(KeyChord::new([Modifier::Cmd], KeyCode::Char('c'))),
            CommandCategory::User,
        )
        .unwrap();
        assert!(!user_cmd.always_active());
    }

    #[test]
    fn best_final_text_prefers_formatted() {
        let turn = Turn {
            transcript: "hello".to_string(),
            words: vec![],
            end_of_turn: true,
            turn_is_formatted: false,
            received_at: Instant::now(),
        };
        let mut u = Utterance::new(1, turn);
        u.unformatted_final_text = Some("hello".to_string());
        assert_eq!(u.best_final_text(), Some("hello"));
        u.formatted_text = Some("Hello.".to_string());
        assert_eq!(u.best_final_text(), Some("Hello."));
    }
}
