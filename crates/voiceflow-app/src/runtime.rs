//! Wires the Settings port, C1 (Audio Source), C2 (Streaming Client), and
//! the engine (C3-C6) together into a running process, and constructs the
//! concrete port implementations (text injection, hotkey, accessibility,
//! UI) that `voiceflow-engine` only knows about as trait objects.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};

use voiceflow_audio::{AudioCaptureThread, AudioChunker, AudioFrame, ChunkerConfig, FrameReader};
use voiceflow_engine::dictation::TextInjectionPort;
use voiceflow_engine::engine::EngineEvent;
use voiceflow_engine::ports::{AccessibilityPort, AlwaysGrantedAccessibilityPort, UiEvent, UiPublisher};
use voiceflow_engine::Engine;
use voiceflow_foundation::clock::{real_clock, SharedClock};
use voiceflow_foundation::{AppState, AudioConfig, HealthMonitor, ShutdownHandler, StateManager};
use voiceflow_stream::{InboundEvent, StreamClientConfig};
use voiceflow_text_injection::{HotkeyPort, InjectionError, InjectionMetrics, MetricsSink, StrategyManager};

use crate::config::Settings;

/// Adapts `StrategyManager` (probing/ordering/timeout-budgeted backend
/// dispatch) to the engine's `TextInjectionPort` contract, keeping a running
/// metrics tally the way the teacher's own pipeline keeps per-stage metrics.
struct ManagedInjector {
    manager: StrategyManager,
    metrics: Mutex<InjectionMetrics>,
}

impl ManagedInjector {
    fn new(config: voiceflow_text_injection::InjectionConfig) -> Self {
        Self {
            manager: StrategyManager::new(config),
            metrics: Mutex::new(InjectionMetrics::default()),
        }
    }
}

#[async_trait]
impl TextInjectionPort for ManagedInjector {
    async fn inject_text(&self, text: &str) -> Result<(), InjectionError> {
        let mut metrics = self.metrics.lock();
        let sink: &mut dyn MetricsSink = &mut *metrics;
        self.manager.inject_with_fail_fast(text, sink).await.map(|_| ())
    }
}

/// Publishes engine events via `tracing`. The real status panel / menu bar
/// is out of scope; this stub keeps the port's contract satisfiable without
/// silently dropping state changes an operator might want to see in logs.
struct TracingUiPublisher;

impl UiPublisher for TracingUiPublisher {
    fn publish(&self, event: UiEvent) {
        match event {
            UiEvent::ModeChanged(mode) => tracing::info!(?mode, "mode changed"),
            UiEvent::HypothesisChanged(text) => tracing::trace!(len = text.len(), "hypothesis changed"),
            UiEvent::UtteranceCompleted(text) => tracing::debug!(len = text.len(), "utterance completed"),
            UiEvent::ConnectionStateChanged(state) => tracing::info!(?state, "connection state changed"),
            UiEvent::Error { kind, message } => tracing::warn!(kind, message, "engine reported error"),
        }
    }
}

// Windows and macOS always pull in voiceflow-text-injection's `enigo`
// feature (see the per-target dependency overrides in Cargo.toml), so
// EnigoHotkey is available there unconditionally. On Linux it's opt-in via
// the `enigo-hotkey` feature, since the default `linux-desktop` backend set
// deliberately excludes the experimental enigo backend.
#[cfg(any(feature = "enigo-hotkey", target_os = "windows", target_os = "macos"))]
fn build_hotkey_port() -> Arc<dyn HotkeyPort> {
    Arc::new(voiceflow_text_injection::EnigoHotkey::new())
}

#[cfg(not(any(feature = "enigo-hotkey", target_os = "windows", target_os = "macos")))]
fn build_hotkey_port() -> Arc<dyn HotkeyPort> {
    tracing::warn!(
        "no enigo backend compiled in (build with --features enigo-hotkey); \
         KeySequence commands will be logged and dropped"
    );
    Arc::new(voiceflow_text_injection::NoOpHotkey)
}

/// Converts resampled `f32` samples in `[-1.0, 1.0]` back to the `i16` PCM
/// the streaming client's wire format expects.
fn to_pcm_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Starts the full pipeline and runs until a shutdown signal (Ctrl-C,
/// SIGTERM, or a voice `Quit` command) is observed.
pub async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let clock: SharedClock = real_clock();

    let state_manager = StateManager::new();
    let _health_monitor = HealthMonitor::new(std::time::Duration::from_secs(10)).start();
    let shutdown = ShutdownHandler::new().install().await;
    state_manager.transition(AppState::Running)?;

    let commands = settings.command_definitions()?;
    let matcher_config = voiceflow_engine::commands::MatcherConfig {
        wake_word: settings.wake_word.clone(),
        pause_ms: settings.pause_ms,
    };

    let text_injector: Arc<dyn TextInjectionPort> = Arc::new(ManagedInjector::new(settings.injection.clone()));
    let hotkey = build_hotkey_port();
    let accessibility: Arc<dyn AccessibilityPort> = Arc::new(AlwaysGrantedAccessibilityPort);
    let ui: Arc<dyn UiPublisher> = Arc::new(TracingUiPublisher);

    let quit_notify = shutdown.handle();
    let on_quit = Box::new(move || quit_notify.notify_waiters());

    let (engine, handle) = Engine::new(
        settings.start_mode(),
        settings.grace_ms,
        commands,
        matcher_config,
        text_injector,
        hotkey,
        accessibility,
        ui,
        settings.redact_logs,
        clock.clone(),
        on_quit,
    );
    let engine_task = tokio::spawn(engine.run());

    // C1: capture -> ring buffer -> chunker, continuously for the life of
    // the process. Mode only gates what the engine does with what it
    // hears, not whether it listens (the "microphone on" command must be
    // audible while in Off mode).
    let audio_cfg = AudioConfig::default();
    let ring = voiceflow_audio::AudioRingBuffer::new(audio_cfg.capture_buffer_samples);
    let (producer, consumer) = ring.split();
    let (capture_thread, dev_cfg, dev_cfg_rx) =
        AudioCaptureThread::spawn(audio_cfg, producer, settings.audio_device.clone())?;

    let frame_reader = FrameReader::new(consumer, dev_cfg.sample_rate, dev_cfg.channels, 4096, None);
    let (frame_tx, _frame_rx) = broadcast::channel::<AudioFrame>(32);
    let chunker = AudioChunker::new(frame_reader, frame_tx.clone(), ChunkerConfig::default())
        .with_device_config(dev_cfg_rx);
    let chunker_task = chunker.spawn();

    // Bridge: chunker's f32 broadcast -> the stream client's i16 mpsc feed.
    let (pcm_tx, pcm_rx) = mpsc::channel::<Vec<i16>>(64);
    let mut bridge_rx = frame_tx.subscribe();
    let bridge_task = tokio::spawn(async move {
        loop {
            match bridge_rx.recv().await {
                Ok(frame) => {
                    if pcm_tx.send(to_pcm_i16(&frame.samples)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "audio bridge lagged; frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // C2: the streaming client owns its own connect/reconnect loop.
    let (stream_shutdown_tx, stream_shutdown_rx) = watch::channel(false);
    let (event_tx, mut event_rx) = mpsc::channel::<InboundEvent>(64);
    let stream_config = StreamClientConfig::default();
    let api_key_env = settings.api_key_env.clone();
    let api_key_fn = move || std::env::var(&api_key_env).unwrap_or_default();
    let stream_clock = clock.clone();
    let stream_task = tokio::spawn(voiceflow_stream::client::run(
        stream_config,
        api_key_fn,
        pcm_rx,
        event_tx,
        stream_clock,
        stream_shutdown_rx,
    ));

    // Forward decoded inbound events into the engine's serialized queue.
    let engine_sender = handle.sender();
    let forward_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if engine_sender.send(EngineEvent::Inbound(event)).await.is_err() {
                break;
            }
        }
    });

    shutdown.wait().await;
    tracing::info!("shutdown requested; stopping pipeline");

    let _ = stream_shutdown_tx.send(true);
    capture_thread.shutdown.store(false, std::sync::atomic::Ordering::SeqCst);
    handle.shutdown().await;

    let _ = engine_task.await;
    let _ = stream_task.await;
    bridge_task.abort();
    chunker_task.abort();
    forward_task.abort();

    state_manager.transition(AppState::Stopping)?;
    state_manager.transition(AppState::Stopped)?;
    Ok(())
}
