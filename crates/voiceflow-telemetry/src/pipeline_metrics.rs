use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-thread pipeline monitoring.
///
/// Covers the audio path (C1), the streaming transport (C2), and the
/// transcription engine (C3-C6) so a single `Arc<PipelineMetrics>` can be
/// handed to every worker without per-stage channels.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Audio level monitoring
    pub current_peak: Arc<AtomicI16>, // Peak sample value in current window
    pub current_rms: Arc<AtomicU64>,  // RMS * 1000 for precision
    pub audio_level_db: Arc<AtomicI16>, // Current level in dB * 10

    // Pipeline stage tracking
    pub stage_capture: Arc<AtomicBool>,
    pub stage_chunker: Arc<AtomicBool>,
    pub stage_stream: Arc<AtomicBool>,
    pub stage_engine: Arc<AtomicBool>,

    // Buffer monitoring
    pub capture_buffer_fill: Arc<AtomicUsize>,
    pub chunker_buffer_fill: Arc<AtomicUsize>,

    // Frame rate tracking (value * 10 for one decimal of precision)
    pub capture_fps: Arc<AtomicU64>,
    pub chunker_fps: Arc<AtomicU64>,

    // Event counters
    pub capture_frames: Arc<AtomicU64>,
    pub chunker_frames: Arc<AtomicU64>,
    pub dropped_frames: Arc<AtomicU64>,

    // Streaming client (C2)
    pub ws_reconnects: Arc<AtomicU64>,
    pub ws_malformed_messages: Arc<AtomicU64>,
    pub ws_current_backoff_ms: Arc<AtomicU64>,

    // Engine (C3-C6)
    pub utterances_completed: Arc<AtomicU64>,
    pub utterances_aborted: Arc<AtomicU64>,
    pub commands_fired: Arc<AtomicU64>,
    pub dictation_injections: Arc<AtomicU64>,
    pub injection_failures: Arc<AtomicU64>,

    // Activity indicators
    pub is_speaking: Arc<AtomicBool>,
    pub last_speech_time: Arc<RwLock<Option<Instant>>>,

    // Error tracking
    pub capture_errors: Arc<AtomicU64>,
    pub chunker_errors: Arc<AtomicU64>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            current_peak: Arc::new(AtomicI16::new(0)),
            current_rms: Arc::new(AtomicU64::new(0)),
            audio_level_db: Arc::new(AtomicI16::new(-900)),

            stage_capture: Arc::new(AtomicBool::new(false)),
            stage_chunker: Arc::new(AtomicBool::new(false)),
            stage_stream: Arc::new(AtomicBool::new(false)),
            stage_engine: Arc::new(AtomicBool::new(false)),

            capture_buffer_fill: Arc::new(AtomicUsize::new(0)),
            chunker_buffer_fill: Arc::new(AtomicUsize::new(0)),

            capture_fps: Arc::new(AtomicU64::new(0)),
            chunker_fps: Arc::new(AtomicU64::new(0)),

            capture_frames: Arc::new(AtomicU64::new(0)),
            chunker_frames: Arc::new(AtomicU64::new(0)),
            dropped_frames: Arc::new(AtomicU64::new(0)),

            ws_reconnects: Arc::new(AtomicU64::new(0)),
            ws_malformed_messages: Arc::new(AtomicU64::new(0)),
            ws_current_backoff_ms: Arc::new(AtomicU64::new(0)),

            utterances_completed: Arc::new(AtomicU64::new(0)),
            utterances_aborted: Arc::new(AtomicU64::new(0)),
            commands_fired: Arc::new(AtomicU64::new(0)),
            dictation_injections: Arc::new(AtomicU64::new(0)),
            injection_failures: Arc::new(AtomicU64::new(0)),

            is_speaking: Arc::new(AtomicBool::new(false)),
            last_speech_time: Arc::new(RwLock::new(None)),

            capture_errors: Arc::new(AtomicU64::new(0)),
            chunker_errors: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl PipelineMetrics {
    pub fn update_audio_level(&self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        let peak = samples.iter().map(|&s| s.abs()).max().unwrap_or(0);
        self.current_peak.store(peak, Ordering::Relaxed);

        let sum: i64 = samples.iter().map(|&s| s as i64 * s as i64).sum();
        let rms = ((sum as f64 / samples.len() as f64).sqrt() * 1000.0) as u64;
        self.current_rms.store(rms, Ordering::Relaxed);

        let db = if peak > 0 {
            (20.0 * (peak as f64 / 32768.0).log10() * 10.0) as i16
        } else {
            -900
        };
        self.audio_level_db.store(db, Ordering::Relaxed);
    }

    pub fn mark_stage_active(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Capture => self.stage_capture.store(true, Ordering::Relaxed),
            PipelineStage::Chunker => self.stage_chunker.store(true, Ordering::Relaxed),
            PipelineStage::Stream => self.stage_stream.store(true, Ordering::Relaxed),
            PipelineStage::Engine => self.stage_engine.store(true, Ordering::Relaxed),
        }
    }

    pub fn decay_stages(&self) {
        self.stage_capture.store(false, Ordering::Relaxed);
        self.stage_chunker.store(false, Ordering::Relaxed);
        self.stage_stream.store(false, Ordering::Relaxed);
        self.stage_engine.store(false, Ordering::Relaxed);
    }

    pub fn update_buffer_fill(&self, buffer: BufferType, fill_percent: usize) {
        let fill = fill_percent.min(100);
        match buffer {
            BufferType::Capture => self.capture_buffer_fill.store(fill, Ordering::Relaxed),
            BufferType::Chunker => self.chunker_buffer_fill.store(fill, Ordering::Relaxed),
        }
    }

    pub fn update_capture_fps(&self, fps: f64) {
        self.capture_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_chunker_fps(&self, fps: f64) {
        self.chunker_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn increment_capture_frames(&self) {
        self.capture_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chunker_frames(&self) {
        self.chunker_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_frame(&self) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ws_reconnect(&self) {
        self.ws_reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_fired(&self) {
        self.commands_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dictation_injection(&self) {
        self.dictation_injections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_injection_failure(&self) {
        self.injection_failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PipelineStage {
    Capture,
    Chunker,
    Stream,
    Engine,
}

#[derive(Debug, Clone, Copy)]
pub enum BufferType {
    Capture,
    Chunker,
}

/// Tracks a rolling frames-per-second figure; one instance per stage.
#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    /// Call once per frame; returns `Some(fps)` roughly once a second.
    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_level_silence_is_minus_90db() {
        let metrics = PipelineMetrics::default();
        metrics.update_audio_level(&[0, 0, 0]);
        assert_eq!(metrics.audio_level_db.load(Ordering::Relaxed), -900);
    }

    #[test]
    fn counters_increment() {
        let metrics = PipelineMetrics::default();
        metrics.record_command_fired();
        metrics.record_command_fired();
        metrics.record_dictation_injection();
        assert_eq!(metrics.commands_fired.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.dictation_injections.load(Ordering::Relaxed), 1);
    }
}
