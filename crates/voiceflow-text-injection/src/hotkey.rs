//! Hotkey port (C4 → OS): synthesizing a single key-chord press-and-release
//! targeting the frontmost application. Lives beside the text-injection
//! backends because both are OS keystroke-synthesis concerns backed by the
//! same `enigo` dependency.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::InjectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Cmd,
    Shift,
    Ctrl,
    Alt,
    Fn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Tab,
    Escape,
    Enter,
    Backspace,
    Delete,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

/// A synthesizable key combination: zero or more modifiers held down, plus
/// a single key pressed and released.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: HashSet<Modifier>,
    pub key: KeyCode,
}

impl KeyChord {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: KeyCode) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key,
        }
    }
}

#[async_trait]
pub trait HotkeyPort: Send + Sync {
    /// Synthesizes a single key-chord press-and-release targeting the
    /// frontmost application.
    async fn send_key_sequence(&self, chord: &KeyChord) -> Result<(), InjectionError>;
}

/// A fallback hotkey port for builds with no keystroke-synthesis backend
/// compiled in. Logs and reports the chord as undelivered rather than
/// panicking or blocking; mirrors `NoOpInjector`'s role on the text
/// injection side, except it reports failure instead of pretending to
/// succeed, since a dropped `KeySequence` action is something the caller
/// (the Command Matcher's dispatch) should be able to notice.
pub struct NoOpHotkey;

#[async_trait]
impl HotkeyPort for NoOpHotkey {
    async fn send_key_sequence(&self, chord: &KeyChord) -> Result<(), InjectionError> {
        tracing::warn!(?chord, "no hotkey backend compiled in; dropping key sequence");
        Err(InjectionError::Unavailable {
            backend: crate::probe::BackendId::Fallback,
            cause: crate::error::UnavailableCause::Environment {
                causes: vec!["no HotkeyPort backend compiled in".to_string()],
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_chord_collects_modifiers() {
        let chord = KeyChord::new([Modifier::Cmd, Modifier::Shift], KeyCode::Char('z'));
        assert_eq!(chord.modifiers.len(), 2);
        assert!(chord.modifiers.contains(&Modifier::Cmd));
        assert_eq!(chord.key, KeyCode::Char('z'));
    }

    #[tokio::test]
    async fn noop_hotkey_reports_unavailable() {
        let port = NoOpHotkey;
        let chord = KeyChord::new([Modifier::Ctrl], KeyCode::Char('z'));
        let err = port.send_key_sequence(&chord).await.unwrap_err();
        assert!(matches!(err, InjectionError::Unavailable { .. }));
    }
}
