//! Settings port (§6): loads layered configuration via the `config` crate —
//! built-in defaults, an optional TOML file, then `VOICEFLOW_`-prefixed
//! environment variables (double underscore for nested keys) — and converts
//! the result into the types `voiceflow-engine` and `voiceflow-text-injection`
//! actually consume.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use voiceflow_engine::{Action, CommandCategory, CommandDefinition, KeyChord, KeyCode, Mode, Modifier};
use voiceflow_foundation::error::ConfigError;
use voiceflow_text_injection::InjectionConfig;

/// On-disk/env-sourced configuration record. Mirrors spec.md §6's
/// `load_settings()` return value plus the ambient fields (`log_level`,
/// `redact_logs`, injection tuning) the teacher's own `Settings` carries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name of the environment variable holding the AssemblyAI API key.
    /// The key itself is never stored in settings or logged.
    pub api_key_env: String,
    pub audio_device: Option<String>,
    pub wake_word: String,
    pub pause_ms: u64,
    pub grace_ms: u64,
    pub start_mode: String,
    pub log_level: String,
    pub redact_logs: bool,
    pub injection: InjectionConfig,
    pub commands: Vec<CommandSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key_env: "ASSEMBLYAI_API_KEY".to_string(),
            audio_device: None,
            wake_word: "voiceflow".to_string(),
            pause_ms: 500,
            grace_ms: 500,
            start_mode: "off".to_string(),
            log_level: "info".to_string(),
            redact_logs: true,
            injection: InjectionConfig::default(),
            commands: default_command_set(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub phrase: String,
    pub category: CommandCategorySpec,
    pub action: ActionSpec,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandCategorySpec {
    System,
    User,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionSpec {
    KeySequence { modifiers: Vec<String>, key: String },
    ModeSet { mode: String },
    Quit,
}

/// The handful of system commands every install ships with; user-defined
/// commands layer on top via the TOML file or a future settings UI.
fn default_command_set() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            phrase: "microphone on".to_string(),
            category: CommandCategorySpec::System,
            action: ActionSpec::ModeSet { mode: "dictation".to_string() },
        },
        CommandSpec {
            phrase: "microphone off".to_string(),
            category: CommandCategorySpec::System,
            action: ActionSpec::ModeSet { mode: "off".to_string() },
        },
        CommandSpec {
            phrase: "wake mode".to_string(),
            category: CommandCategorySpec::System,
            action: ActionSpec::ModeSet { mode: "wake".to_string() },
        },
        CommandSpec {
            phrase: "quit voiceflow".to_string(),
            category: CommandCategorySpec::System,
            action: ActionSpec::Quit,
        },
    ]
}

fn parse_modifier(s: &str) -> Result<Modifier, ConfigError> {
    match s.to_lowercase().as_str() {
        "cmd" | "meta" | "super" => Ok(Modifier::Cmd),
        "shift" => Ok(Modifier::Shift),
        "ctrl" | "control" => Ok(Modifier::Ctrl),
        "alt" => Ok(Modifier::Alt),
        "fn" => Ok(Modifier::Fn),
        other => Err(ConfigError::Validation {
            field: "commands[].action.modifiers".to_string(),
            reason: format!("unknown modifier {other:?}"),
        }),
    }
}

fn parse_key(s: &str) -> Result<KeyCode, ConfigError> {
    match s.to_lowercase().as_str() {
        "tab" => Ok(KeyCode::Tab),
        "escape" | "esc" => Ok(KeyCode::Escape),
        "enter" | "return" => Ok(KeyCode::Enter),
        "backspace" => Ok(KeyCode::Backspace),
        "delete" | "del" => Ok(KeyCode::Delete),
        "up" | "arrowup" => Ok(KeyCode::ArrowUp),
        "down" | "arrowdown" => Ok(KeyCode::ArrowDown),
        "left" | "arrowleft" => Ok(KeyCode::ArrowLeft),
        "right" | "arrowright" => Ok(KeyCode::ArrowRight),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(KeyCode::Char(c)),
                _ => Err(ConfigError::Validation {
                    field: "commands[].action.key".to_string(),
                    reason: format!("unknown key {other:?}"),
                }),
            }
        }
    }
}

fn parse_mode(s: &str) -> Result<Mode, ConfigError> {
    match s.to_lowercase().as_str() {
        "off" => Ok(Mode::Off),
        "dictation" => Ok(Mode::Dictation),
        "wake" => Ok(Mode::Wake),
        other => Err(ConfigError::Validation {
            field: "mode".to_string(),
            reason: format!("unknown mode {other:?}, expected off|dictation|wake"),
        }),
    }
}

impl Settings {
    /// Soft-clamps out-of-range timing fields (warn-and-clamp) and
    /// hard-rejects structurally invalid entries (empty command phrases),
    /// per SPEC_FULL.md §1.1's clamping-and-warn / hard-reject split.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.pause_ms == 0 || self.pause_ms > 10_000 {
            tracing::warn!(pause_ms = self.pause_ms, "pause_ms out of range, clamping to 500");
            self.pause_ms = 500;
        }
        if self.grace_ms == 0 || self.grace_ms > 10_000 {
            tracing::warn!(grace_ms = self.grace_ms, "grace_ms out of range, clamping to 500");
            self.grace_ms = 500;
        }
        parse_mode(&self.start_mode)?;
        if self.wake_word.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "wake_word".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn start_mode(&self) -> Mode {
        parse_mode(&self.start_mode).unwrap_or(Mode::Off)
    }

    /// Reads the API key fresh on every call, so a settings reload's
    /// credential rotation is picked up on the streaming client's next
    /// reconnect without restarting the process.
    pub fn read_api_key(&self) -> String {
        std::env::var(&self.api_key_env).unwrap_or_default()
    }

    /// Converts the TOML-friendly `CommandSpec` list into the engine's
    /// `CommandDefinition`s, surfacing the first structural error rather
    /// than silently dropping entries (callers decide whether to fall back
    /// to the previous valid set, per spec.md §7's ConfigurationError row).
    pub fn command_definitions(&self) -> Result<Arc<Vec<CommandDefinition>>, ConfigError> {
        let mut seen_phrases = HashSet::new();
        let mut out = Vec::with_capacity(self.commands.len());
        for spec in &self.commands {
            let category = match spec.category {
                CommandCategorySpec::System => CommandCategory::System,
                CommandCategorySpec::User => CommandCategory::User,
            };
            let action = match &spec.action {
                ActionSpec::KeySequence { modifiers, key } => {
                    let mods = modifiers
                        .iter()
                        .map(|m| parse_modifier(m))
                        .collect::<Result<Vec<_>, _>>()?;
                    Action::KeySequence(KeyChord::new(mods, parse_key(key)?))
                }
                ActionSpec::ModeSet { mode } => Action::ModeSet(parse_mode(mode)?),
                ActionSpec::Quit => Action::Quit,
            };
            let def = CommandDefinition::new(&spec.phrase, action, category)?;
            if !seen_phrases.insert(def.phrase.clone()) {
                return Err(ConfigError::Validation {
                    field: "commands[].phrase".to_string(),
                    reason: format!("duplicate command phrase {:?}", def.phrase),
                });
            }
            out.push(def);
        }
        Ok(Arc::new(out))
    }
}

/// Loads settings from built-in defaults, an optional TOML file (path from
/// `VOICEFLOW_CONFIG`, defaulting to `voiceflow.toml` in the working
/// directory), and `VOICEFLOW_`-prefixed environment variables, in that
/// priority order. A missing config file is not an error.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let config_path = std::env::var("VOICEFLOW_CONFIG").unwrap_or_else(|_| "voiceflow.toml".to_string());
    load_settings_from(Path::new(&config_path))
}

fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let defaults = Settings::default();
    let mut builder = config::Config::builder()
        .set_default("api_key_env", defaults.api_key_env.clone())
        .map_err(ConfigError::Parse)?
        .set_default("wake_word", defaults.wake_word.clone())
        .map_err(ConfigError::Parse)?
        .set_default("pause_ms", defaults.pause_ms as i64)
        .map_err(ConfigError::Parse)?
        .set_default("grace_ms", defaults.grace_ms as i64)
        .map_err(ConfigError::Parse)?
        .set_default("start_mode", defaults.start_mode.clone())
        .map_err(ConfigError::Parse)?
        .set_default("log_level", defaults.log_level.clone())
        .map_err(ConfigError::Parse)?
        .set_default("redact_logs", defaults.redact_logs)
        .map_err(ConfigError::Parse)?;

    if path.exists() {
        builder = builder.add_source(config::File::from(PathBuf::from(path)));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("VOICEFLOW")
            .separator("__")
            .try_parsing(true),
    );

    let raw = builder.build().map_err(ConfigError::Parse)?;
    let mut settings: Settings = raw.try_deserialize().map_err(ConfigError::Parse)?;
    if settings.commands.is_empty() {
        settings.commands = default_command_set();
    }
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.start_mode(), Mode::Off);
    }

    #[test]
    fn out_of_range_pause_is_clamped_not_rejected() {
        let mut settings = Settings::default();
        settings.pause_ms = 0;
        assert!(settings.validate().is_ok());
        assert_eq!(settings.pause_ms, 500);
    }

    #[test]
    fn empty_wake_word_is_rejected() {
        let mut settings = Settings::default();
        settings.wake_word = "   ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn default_commands_convert_to_definitions() {
        let settings = Settings::default();
        let defs = settings.command_definitions().unwrap();
        assert!(defs.iter().any(|d| d.phrase == "microphone on"));
        assert!(defs.iter().any(|d| d.phrase == "quit voiceflow"));
    }

    #[test]
    fn duplicate_phrases_are_rejected() {
        let mut settings = Settings::default();
        settings.commands.push(CommandSpec {
            phrase: "Microphone On".to_string(),
            category: CommandCategorySpec::System,
            action: ActionSpec::ModeSet { mode: "off".to_string() },
        });
        assert!(settings.command_definitions().is_err());
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let settings = load_settings_from(Path::new("/nonexistent/voiceflow.toml"));
        assert!(settings.is_ok());
    }

    #[test]
    fn key_sequence_parses_modifiers_and_key() {
        let mut settings = Settings::default();
        settings.commands = vec![CommandSpec {
            phrase: "copy that".to_string(),
            category: CommandCategorySpec::User,
            action: ActionSpec::KeySequence {
                modifiers: vec!["cmd".to_string()],
                key: "c".to_string(),
            },
        }];
        let defs = settings.command_definitions().unwrap();
        assert_eq!(defs.len(), 1);
        assert!(matches!(defs[0].action, Action::KeySequence(_)));
    }
}
