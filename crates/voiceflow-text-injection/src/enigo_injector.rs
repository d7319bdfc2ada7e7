//! `enigo`-backed hotkey port: synthesizes a key-chord press-and-release via
//! the OS input-injection APIs `enigo` wraps (XTest/uinput/Windows
//! SendInput/macOS CGEvent). This is the concrete `HotkeyPort` the engine's
//! Command Matcher (C4) dispatches `KeySequence` actions to.
//!
//! `Enigo` itself is not `Send`, so a fresh instance is constructed inside
//! `spawn_blocking` for each call rather than held across awaits.

use async_trait::async_trait;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use tracing::debug;

use crate::error::InjectionError;
use crate::hotkey::{HotkeyPort, KeyChord, KeyCode, Modifier};

/// Synthesizes hotkeys through `enigo`.
pub struct EnigoHotkey;

impl EnigoHotkey {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnigoHotkey {
    fn default() -> Self {
        Self::new()
    }
}

fn to_enigo_modifier(modifier: Modifier) -> Key {
    match modifier {
        Modifier::Cmd => Key::Meta,
        Modifier::Shift => Key::Shift,
        Modifier::Ctrl => Key::Control,
        Modifier::Alt => Key::Alt,
        Modifier::Fn => Key::Function,
    }
}

fn to_enigo_key(key: KeyCode) -> Key {
    match key {
        KeyCode::Char(c) => Key::Unicode(c),
        KeyCode::Tab => Key::Tab,
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter => Key::Return,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::ArrowUp => Key::UpArrow,
        KeyCode::ArrowDown => Key::DownArrow,
        KeyCode::ArrowLeft => Key::LeftArrow,
        KeyCode::ArrowRight => Key::RightArrow,
    }
}

#[async_trait]
impl HotkeyPort for EnigoHotkey {
    async fn send_key_sequence(&self, chord: &KeyChord) -> Result<(), InjectionError> {
        let modifiers: Vec<Key> = chord.modifiers.iter().copied().map(to_enigo_modifier).collect();
        let key = to_enigo_key(chord.key);

        tokio::task::spawn_blocking(move || {
            let mut enigo = Enigo::new(&Settings::default())
                .map_err(|e| InjectionError::Other(format!("enigo init failed: {e}")))?;

            for m in &modifiers {
                enigo
                    .key(*m, Direction::Press)
                    .map_err(|e| InjectionError::Other(format!("enigo key press failed: {e}")))?;
            }

            enigo
                .key(key, Direction::Click)
                .map_err(|e| InjectionError::Other(format!("enigo key click failed: {e}")))?;

            for m in modifiers.iter().rev() {
                enigo
                    .key(*m, Direction::Release)
                    .map_err(|e| InjectionError::Other(format!("enigo key release failed: {e}")))?;
            }

            debug!("synthesized key chord via enigo");
            Ok(())
        })
        .await
        .map_err(|e| InjectionError::Other(format!("enigo task join failed: {e}")))?
    }
}
