//! Top-level orchestrator: the single "engine" task that owns
//! Session/Utterance/Mode/dedupe state exclusively and processes a
//! serialized queue of events — nothing outside this loop mutates that
//! state, so there is never a need to lock it.

use std::sync::Arc;

use tokio::sync::mpsc;

use voiceflow_foundation::clock::SharedClock;
use voiceflow_stream::InboundEvent;
use voiceflow_text_injection::HotkeyPort;

use crate::aggregator::{AggregatorOutput, TurnAggregator, TurnEvent};
use crate::commands::{CommandMatcher, FiredCommand, MatcherConfig};
use crate::dictation::{DictationEmitter, TextInjectionPort};
use crate::mode::{ModeController, TransitionSource};
use crate::model::{Action, CommandDefinition, Mode};
use crate::ports::{AccessibilityPort, UiEvent, UiPublisher};

/// Events the serialized engine loop accepts. Raw audio frames are consumed
/// inside the streaming client's own task (voiceflow-stream) and never
/// reach this queue.
pub enum EngineEvent {
    Inbound(InboundEvent),
    GraceTimerFired { utterance_id: u64 },
    ModeRequested(Mode, TransitionSource),
    SettingsReloaded {
        commands: Arc<Vec<CommandDefinition>>,
        matcher_config: MatcherConfig,
    },
    ShutdownRequested,
}

/// Cheap, cloneable handle external callers (the CLI, a settings-change
/// listener, a global hotkey for a manual mode toggle) use to push events
/// into the engine's serialized queue without touching engine state
/// directly.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineEvent>,
    mode_rx: tokio::sync::watch::Receiver<Mode>,
}

impl EngineHandle {
    /// Cheap, lock-free read of the current mode — for UI indicators and
    /// hotkey listeners that want the mode without round-tripping through
    /// the engine's event queue.
    pub fn mode_rx(&self) -> tokio::sync::watch::Receiver<Mode> {
        self.mode_rx.clone()
    }

    pub async fn request_mode(&self, mode: Mode, source: TransitionSource) {
        let _ = self.tx.send(EngineEvent::ModeRequested(mode, source)).await;
    }

    pub async fn reload_settings(&self, commands: Arc<Vec<CommandDefinition>>, matcher_config: MatcherConfig) {
        let _ = self
            .tx
            .send(EngineEvent::SettingsReloaded {
                commands,
                matcher_config,
            })
            .await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(EngineEvent::ShutdownRequested).await;
    }

    pub fn sender(&self) -> mpsc::Sender<EngineEvent> {
        self.tx.clone()
    }
}

pub struct Engine {
    mode: ModeController,
    aggregator: TurnAggregator,
    matcher: CommandMatcher,
    dictation: DictationEmitter,
    hotkey: Arc<dyn HotkeyPort>,
    accessibility: Arc<dyn AccessibilityPort>,
    ui: Arc<dyn UiPublisher>,
    events: mpsc::Receiver<EngineEvent>,
    self_tx: mpsc::Sender<EngineEvent>,
    on_quit: Box<dyn Fn() + Send + Sync>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        initial_mode: Mode,
        grace_ms: u64,
        commands: Arc<Vec<CommandDefinition>>,
        matcher_config: MatcherConfig,
        injector: Arc<dyn TextInjectionPort>,
        hotkey: Arc<dyn HotkeyPort>,
        accessibility: Arc<dyn AccessibilityPort>,
        ui: Arc<dyn UiPublisher>,
        redact_logs: bool,
        clock: SharedClock,
        on_quit: Box<dyn Fn() + Send + Sync>,
    ) -> (Self, EngineHandle) {
        let (mode_controller, mode_rx) = ModeController::new(initial_mode);
        let (tx, rx) = mpsc::channel(256);
        let engine = Self {
            mode: mode_controller,
            aggregator: TurnAggregator::new(grace_ms, clock.clone()),
            matcher: CommandMatcher::new(commands, matcher_config, clock),
            dictation: DictationEmitter::new(injector, redact_logs),
            hotkey,
            accessibility,
            ui,
            events: rx,
            self_tx: tx.clone(),
            on_quit,
        };
        (engine, EngineHandle { tx, mode_rx })
    }

    pub fn current_mode(&self) -> Mode {
        self.mode.current()
    }

    /// Drains the event queue until `ShutdownRequested`, applying each
    /// event to completion before looking at the next.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            match event {
                EngineEvent::Inbound(inbound) => self.handle_inbound(inbound).await,
                EngineEvent::GraceTimerFired { utterance_id } => {
                    // Stale timers from an utterance that already closed via
                    // the formatted event are harmless: the aggregator only
                    // acts on this while still `AwaitingFormatted`, and it
                    // doesn't track which utterance id a pending timer was
                    // for, so a timer that fires against the *next*
                    // utterance's AwaitingFormatted state would be wrong —
                    // guarded by comparing against the utterance the
                    // aggregator still has open.
                    if self
                        .aggregator
                        .utterance()
                        .map(|u| u.id)
                        .unwrap_or_default()
                        == utterance_id
                    {
                        let outputs = self.aggregator.on_grace_timeout();
                        self.apply_outputs(outputs).await;
                    }
                }
                EngineEvent::ModeRequested(target, source) => {
                    self.mode.apply(target, source);
                    self.ui.publish(UiEvent::ModeChanged(target));
                }
                EngineEvent::SettingsReloaded {
                    commands,
                    matcher_config,
                } => {
                    self.matcher.set_commands(commands);
                    self.matcher.set_config(matcher_config);
                }
                EngineEvent::ShutdownRequested => {
                    let outputs = self.aggregator.on_connection_lost();
                    self.apply_outputs(outputs).await;
                    break;
                }
            }
        }
    }

    async fn handle_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Begin { session_id } => {
                tracing::info!(session_id, "speech session opened");
                self.ui.publish(UiEvent::ConnectionStateChanged(
                    crate::model::ConnectionState::Open,
                ));
            }
            InboundEvent::Turn {
                transcript,
                words,
                end_of_turn,
                turn_is_formatted,
            } => {
                let outputs = self.aggregator.on_turn(TurnEvent {
                    transcript,
                    words,
                    end_of_turn,
                    turn_is_formatted,
                });
                self.apply_outputs(outputs).await;
            }
            InboundEvent::Termination => {
                let outputs = self.aggregator.on_connection_lost();
                self.apply_outputs(outputs).await;
                self.ui.publish(UiEvent::ConnectionStateChanged(
                    crate::model::ConnectionState::Disconnected,
                ));
            }
            InboundEvent::Error { code, message } => {
                tracing::warn!(?code, message, "speech service error");
                self.ui.publish(UiEvent::Error {
                    kind: code.clone().unwrap_or_else(|| "unknown".to_string()),
                    message: message.clone(),
                });
                if code.as_deref() == Some("credential_rejected") {
                    self.mode.apply(Mode::Off, TransitionSource::CredentialRejected);
                    self.ui.publish(UiEvent::ModeChanged(Mode::Off));
                }
            }
        }
    }

    async fn apply_outputs(&mut self, outputs: Vec<AggregatorOutput>) {
        for output in outputs {
            match output {
                AggregatorOutput::HypothesisChanged { utterance_id } => {
                    let hypothesis = self
                        .aggregator
                        .utterance()
                        .map(|u| u.hypothesis())
                        .unwrap_or_default();
                    self.ui.publish(UiEvent::HypothesisChanged(hypothesis));

                    let mode = self.mode.current();
                    let fires = {
                        let Some(utterance) = self.aggregator.utterance_mut() else {
                            continue;
                        };
                        self.matcher.on_hypothesis_changed(utterance, mode)
                    };
                    self.dispatch_fires(utterance_id, fires).await;
                }
                AggregatorOutput::UtteranceEndedUnformatted {
                    utterance_id,
                    unformatted_text,
                } => {
                    let mode = self.mode.current();
                    let fires = {
                        let Some(utterance) = self.aggregator.utterance_mut() else {
                            continue;
                        };
                        self.matcher
                            .on_utterance_ended_unformatted(utterance, mode, &unformatted_text)
                    };
                    self.dispatch_fires(utterance_id, fires).await;
                    self.arm_grace_timer(utterance_id);
                }
                AggregatorOutput::UtteranceEndedFormatted {
                    utterance_id,
                    final_text,
                    consumed_by_command: consumed,
                } => {
                    let mode = self.mode.current();
                    if self.accessibility_ok().await {
                        self.dictation
                            .on_utterance_ended(utterance_id, mode, consumed, &final_text)
                            .await;
                    } else {
                        tracing::warn!(
                            utterance_id,
                            "accessibility permission not granted; dictation suppressed"
                        );
                    }
                    self.matcher.clear_utterance(utterance_id);
                    self.ui.publish(UiEvent::UtteranceCompleted(final_text));
                }
                AggregatorOutput::UtteranceAborted { utterance_id } => {
                    self.matcher.clear_utterance(utterance_id);
                    tracing::debug!(utterance_id, "utterance aborted");
                }
            }
        }
    }

    async fn accessibility_ok(&self) -> bool {
        self.accessibility.check_accessibility_permission().await
    }

    async fn dispatch_fires(&mut self, utterance_id: u64, fires: Vec<FiredCommand>) {
        for fire in fires {
            tracing::info!(
                utterance_id,
                phrase = %fire.phrase,
                reason = ?fire.reason,
                "command fired"
            );
            // Per spec.md §4.4: firing a command marks the utterance consumed
            // regardless of whether dispatch itself succeeds — a blocked or
            // failed hotkey still suppresses dictation for this utterance.
            self.mark_consumed(utterance_id);
            match fire.action {
                Action::KeySequence(chord) => {
                    if !self.accessibility_ok().await {
                        tracing::warn!(
                            utterance_id,
                            phrase = %fire.phrase,
                            "accessibility permission not granted; hotkey suppressed"
                        );
                        continue;
                    }
                    if let Err(err) = self.hotkey.send_key_sequence(&chord).await {
                        tracing::warn!(utterance_id, phrase = %fire.phrase, error = %err, "hotkey dispatch failed");
                    }
                }
                Action::ModeSet(target) => {
                    self.mode.apply(target, TransitionSource::Voice);
                    self.ui.publish(UiEvent::ModeChanged(target));
                }
                Action::Quit => {
                    self.mode.apply(Mode::Off, TransitionSource::Quit);
                    self.ui.publish(UiEvent::ModeChanged(Mode::Off));
                    (self.on_quit)();
                }
                Action::CancelLast => {
                    // Reserved; not wired to any behavior in V1.
                }
            }
        }
    }

    fn mark_consumed(&mut self, utterance_id: u64) {
        if let Some(u) = self.aggregator.utterance_mut() {
            if u.id == utterance_id {
                u.consumed_by_command = true;
            }
        }
    }

    fn arm_grace_timer(&self, utterance_id: u64) {
        let grace_ms = self.aggregator.grace_ms;
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(grace_ms)).await;
            let _ = tx.send(EngineEvent::GraceTimerFired { utterance_id }).await;
        });
    }
}
