//! Command Matcher (C4): matches voice commands against the live
//! hypothesis, enforcing per-utterance dedupe and the instant-prefix /
//! pause execution policies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use voiceflow_foundation::clock::SharedClock;

use crate::model::{Action, CommandDefinition, Mode, Utterance};

/// Lowercases and collapses runs of whitespace to single ASCII spaces,
/// trimming the ends. Used both to normalize the hypothesis for matching
/// and to normalize command phrases once at load time.
pub fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Configurable, case-insensitive, whitespace-normalized at load.
    pub wake_word: String,
    pub pause_ms: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            wake_word: "voiceflow".to_string(),
            pause_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireReason {
    InstantPrefix,
    PauseTimeout,
    UtteranceEnded,
}

#[derive(Debug, Clone)]
pub struct FiredCommand {
    pub phrase: String,
    pub action: Action,
    pub reason: FireReason,
}

/// Finds every word-boundary occurrence of `phrase` in `hypothesis`.
/// Boundary means the match is at position 0 or preceded by a space, and
/// ends at the hypothesis length or is followed by a space — this is what
/// stops "copy" from matching inside "photocopy".
fn find_matches(hypothesis: &str, phrase: &str) -> Vec<usize> {
    if phrase.is_empty() {
        return Vec::new();
    }
    let bytes = hypothesis.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    while start <= hypothesis.len() {
        match hypothesis[start..].find(phrase) {
            Some(rel) => {
                let pos = start + rel;
                let end = pos + phrase.len();
                let left_ok = pos == 0 || bytes[pos - 1] == b' ';
                let right_ok = end == hypothesis.len() || bytes[end] == b' ';
                if left_ok && right_ok {
                    out.push(pos);
                }
                start = pos + 1;
            }
            None => break,
        }
    }
    out
}

/// Whether `hypothesis[..pos]` ends with the wake word followed by exactly
/// one space, i.e. the command at `pos` is in instant-prefix position.
fn is_wake_prefixed(hypothesis: &str, pos: usize, wake_word: &str) -> bool {
    let needle_len = wake_word.len() + 1; // wake word + single space
    if pos < needle_len {
        return false;
    }
    let slice = &hypothesis[pos - needle_len..pos];
    slice == format!("{wake_word} ")
}

pub struct CommandMatcher {
    commands: Arc<Vec<CommandDefinition>>,
    config: MatcherConfig,
    clock: SharedClock,
    /// Per (utterance id, phrase): the instant a non-prefix match was first
    /// seen, paired with the hypothesis length at that moment. Cleared when
    /// the utterance terminates, when the phrase drops out of the current
    /// hypothesis, or when new words grow the hypothesis past where it
    /// stood at first sight — each restarts the continuous-presence clock.
    first_seen: HashMap<(u64, String), (Instant, usize)>,
}

impl CommandMatcher {
    pub fn new(commands: Arc<Vec<CommandDefinition>>, config: MatcherConfig, clock: SharedClock) -> Self {
        Self {
            commands,
            config,
            clock,
            first_seen: HashMap::new(),
        }
    }

    pub fn set_commands(&mut self, commands: Arc<Vec<CommandDefinition>>) {
        self.commands = commands;
    }

    pub fn set_config(&mut self, config: MatcherConfig) {
        self.config = config;
    }

    /// Commands the matcher considers in the given mode: everything in
    /// Wake, only the always-active system commands otherwise.
    fn active_commands(&self, mode: Mode) -> impl Iterator<Item = &CommandDefinition> {
        self.commands
            .iter()
            .filter(move |c| mode == Mode::Wake || c.always_active())
    }

    /// Drives one HypothesisChanged event: finds left-to-right matches
    /// among active, not-yet-fired commands, fires instant-prefix matches
    /// immediately, and fires any non-prefix match that has sat in the
    /// hypothesis for at least `pause_ms` (the worst-case-latency bound;
    /// the common case is firing via `on_utterance_ended_unformatted`
    /// instead, which usually wins the race).
    pub fn on_hypothesis_changed(&mut self, utterance: &mut Utterance, mode: Mode) -> Vec<FiredCommand> {
        let hypothesis = utterance.hypothesis();
        let hypothesis_len = hypothesis.len();
        let mut matches: Vec<(usize, CommandDefinition, bool)> = Vec::new();

        for cmd in self.active_commands(mode) {
            if utterance.executed_commands.contains(&cmd.phrase) {
                continue;
            }
            for pos in find_matches(&hypothesis, &cmd.phrase) {
                let prefixed = is_wake_prefixed(&hypothesis, pos, &self.config.wake_word);
                matches.push((pos, cmd.clone(), prefixed));
            }
        }
        matches.sort_by_key(|(pos, _, _)| *pos);

        // A phrase the recognizer has revised away no longer appears in any
        // match this round. Drop its pending timer so a later reappearance
        // starts a fresh pause-timeout clock instead of firing on a stale
        // first-seen timestamp.
        let present: std::collections::HashSet<&str> =
            matches.iter().map(|(_, cmd, _)| cmd.phrase.as_str()).collect();
        self.first_seen
            .retain(|(id, phrase), _| *id != utterance.id || present.contains(phrase.as_str()));

        let now = self.clock.now();
        let mut fires = Vec::new();
        for (_, cmd, prefixed) in matches {
            if utterance.executed_commands.contains(&cmd.phrase) {
                continue;
            }
            let key = (utterance.id, cmd.phrase.clone());
            if prefixed {
                utterance.executed_commands.insert(cmd.phrase.clone());
                self.first_seen.remove(&key);
                fires.push(FiredCommand {
                    phrase: cmd.phrase.clone(),
                    action: cmd.action.clone(),
                    reason: FireReason::InstantPrefix,
                });
                continue;
            }

            // New non-final words extending past where the hypothesis stood
            // when this phrase first appeared restart its presence clock;
            // without growth since then, presence has been continuous.
            let needs_reset = match self.first_seen.get(&key) {
                Some((_, seen_len)) => hypothesis_len > *seen_len,
                None => true,
            };
            if needs_reset {
                self.first_seen.insert(key.clone(), (now, hypothesis_len));
            }
            let (first, _) = self.first_seen[&key];
            if now.duration_since(first) >= Duration::from_millis(self.config.pause_ms) {
                utterance.executed_commands.insert(cmd.phrase.clone());
                self.first_seen.remove(&key);
                fires.push(FiredCommand {
                    phrase: cmd.phrase.clone(),
                    action: cmd.action.clone(),
                    reason: FireReason::PauseTimeout,
                });
            }
        }
        fires
    }

    /// Drives the Open → AwaitingFormatted transition: any active,
    /// not-yet-fired command present in the final (unformatted) transcript
    /// fires now, per the pause policy's branch (a).
    pub fn on_utterance_ended_unformatted(
        &mut self,
        utterance: &mut Utterance,
        mode: Mode,
        final_transcript: &str,
    ) -> Vec<FiredCommand> {
        let normalized = normalize(final_transcript);
        let mut matches: Vec<(usize, CommandDefinition)> = Vec::new();
        for cmd in self.active_commands(mode) {
            if utterance.executed_commands.contains(&cmd.phrase) {
                continue;
            }
            for pos in find_matches(&normalized, &cmd.phrase) {
                matches.push((pos, cmd.clone()));
            }
        }
        matches.sort_by_key(|(pos, _)| *pos);

        let mut fires = Vec::new();
        for (_, cmd) in matches {
            if utterance.executed_commands.contains(&cmd.phrase) {
                continue;
            }
            utterance.executed_commands.insert(cmd.phrase.clone());
            self.first_seen.remove(&(utterance.id, cmd.phrase.clone()));
            fires.push(FiredCommand {
                phrase: cmd.phrase.clone(),
                action: cmd.action.clone(),
                reason: FireReason::UtteranceEnded,
            });
        }
        fires
    }

    /// Drops any pending pause-timeout bookkeeping for a terminated
    /// utterance. The dedupe set itself lives on the Utterance and is
    /// discarded along with it.
    pub fn clear_utterance(&mut self, utterance_id: u64) {
        self.first_seen.retain(|(id, _), _| *id != utterance_id);
    }
}
