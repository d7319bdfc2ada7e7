//! Fixed constants for the capture -> chunker audio path.

/// Target sample rate fed to the streaming client (C2): 16kHz mono.
pub const TARGET_SAMPLE_RATE_HZ: u32 = 16_000;

/// Chunker output frame size: 800 samples at 16kHz (50ms), per the Audio
/// Source contract in spec.md §4.1.
pub const FRAME_SIZE_SAMPLES: usize = 800;

/// Ring buffer capacity in samples. At 16kHz mono this is roughly 4 seconds
/// of headroom between the CPAL callback and the chunker's poll loop.
pub const RING_BUFFER_CAPACITY_SAMPLES: usize = 65_536;

/// Maximum queued frames between capture and any downstream consumer before
/// the oldest is dropped. At 512 samples/frame and 16kHz this is ~1s.
pub const MAX_QUEUED_FRAMES: usize = 20;
