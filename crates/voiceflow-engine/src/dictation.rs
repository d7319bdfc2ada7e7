//! Dictation Emitter (C5): at the end of an utterance, injects the best
//! available final text through the text-injection port, unless the
//! utterance was consumed by a fired command.

use std::sync::Arc;

use async_trait::async_trait;

use voiceflow_text_injection::InjectionError;

use crate::model::Mode;

/// The text-injection port (C5 → OS). Implementations are free to use
/// clipboard paste internally; if they do, they must save and restore the
/// prior clipboard contents as part of one atomic call.
#[async_trait]
pub trait TextInjectionPort: Send + Sync {
    async fn inject_text(&self, text: &str) -> Result<(), InjectionError>;
}

pub struct DictationEmitter {
    injector: Arc<dyn TextInjectionPort>,
    redact_logs: bool,
}

impl DictationEmitter {
    pub fn new(injector: Arc<dyn TextInjectionPort>, redact_logs: bool) -> Self {
        Self {
            injector,
            redact_logs,
        }
    }

    /// Drives `UtteranceEndedFormatted`. Strictly end-of-utterance: never
    /// called on `HypothesisChanged` or the unformatted end-of-turn event.
    /// No-ops outside Dictation mode or when the utterance was consumed by
    /// a fired command; on injection failure, logs and moves on — no
    /// retry, no partial injection, and the next utterance is unaffected.
    pub async fn on_utterance_ended(
        &self,
        utterance_id: u64,
        mode: Mode,
        consumed_by_command: bool,
        final_text: &str,
    ) {
        if mode != Mode::Dictation || consumed_by_command {
            return;
        }
        if final_text.is_empty() {
            return;
        }

        if self.redact_logs {
            tracing::debug!(utterance_id, len = final_text.len(), "injecting dictation");
        } else {
            tracing::debug!(utterance_id, text = final_text, "injecting dictation");
        }

        match self.injector.inject_text(final_text).await {
            Ok(()) => {
                tracing::info!(utterance_id, "dictation injected");
            }
            Err(err) => {
                tracing::warn!(
                    utterance_id,
                    text_len = final_text.len(),
                    error = %err,
                    "dictation injection failed; not retrying"
                );
            }
        }
    }
}
