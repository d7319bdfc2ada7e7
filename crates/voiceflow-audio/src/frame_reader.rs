use std::time::Instant;

use voiceflow_telemetry::{BufferType, PipelineMetrics};
use std::sync::Arc;

use super::capture::AudioFrame;
use super::ring_buffer::AudioConsumer;

/// Pulls raw i16 samples out of the capture ring buffer and stamps them as
/// [`AudioFrame`]s, tracking the device's current sample rate/channel count
/// so the chunker can tell when it needs to reconfigure its resampler.
pub struct FrameReader {
    consumer: AudioConsumer,
    sample_rate: u32,
    channels: u16,
    capacity_samples: usize,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl FrameReader {
    pub fn new(
        consumer: AudioConsumer,
        sample_rate: u32,
        channels: u16,
        capacity_samples: usize,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> Self {
        Self {
            consumer,
            sample_rate,
            channels,
            capacity_samples,
            metrics,
        }
    }

    /// Drains up to `max_samples` from the ring buffer. Returns `None` if
    /// nothing is queued.
    pub fn read_frame(&mut self, max_samples: usize) -> Option<AudioFrame> {
        let mut buf = vec![0i16; max_samples];
        let n = self.consumer.read(&mut buf);
        if n == 0 {
            return None;
        }
        buf.truncate(n);

        if let Some(m) = &self.metrics {
            let fill_percent = n.saturating_mul(100) / self.capacity_samples.max(1);
            m.update_buffer_fill(BufferType::Capture, fill_percent);
        }

        Some(AudioFrame {
            samples: buf,
            timestamp: Instant::now(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    /// Called when the capture thread reports a device config change so
    /// subsequent frames are stamped with the new rate/channel count.
    pub fn update_device_config(&mut self, sample_rate: u32, channels: u16) {
        self.sample_rate = sample_rate;
        self.channels = channels;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::AudioRingBuffer;

    #[test]
    fn read_frame_returns_none_when_empty() {
        let rb = AudioRingBuffer::new(1024);
        let (_prod, cons) = rb.split();
        let mut reader = FrameReader::new(cons, 16_000, 1, 1024, None);
        assert!(reader.read_frame(256).is_none());
    }

    #[test]
    fn read_frame_returns_queued_samples() {
        let rb = AudioRingBuffer::new(1024);
        let (mut prod, cons) = rb.split();
        prod.write(&[1, 2, 3, 4]).unwrap();
        let mut reader = FrameReader::new(cons, 16_000, 1, 1024, None);
        let frame = reader.read_frame(256).expect("frame expected");
        assert_eq!(frame.samples, vec![1, 2, 3, 4]);
        assert_eq!(frame.sample_rate, 16_000);
    }

    #[test]
    fn update_device_config_changes_stamped_rate() {
        let rb = AudioRingBuffer::new(1024);
        let (mut prod, cons) = rb.split();
        prod.write(&[1, 2]).unwrap();
        let mut reader = FrameReader::new(cons, 16_000, 1, 1024, None);
        reader.update_device_config(48_000, 2);
        let frame = reader.read_frame(256).expect("frame expected");
        assert_eq!(frame.sample_rate, 48_000);
        assert_eq!(frame.channels, 2);
    }
}
