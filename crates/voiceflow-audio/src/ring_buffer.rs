use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use voiceflow_foundation::AudioError;

/// A bounded SPSC sample queue between the CPAL capture callback and the
/// chunker. Backed by a mutex-guarded deque rather than a lock-free
/// structure: the critical section is a handful of pushes/pops, well under
/// what would make contention with the audio callback a problem.
struct Inner {
    queue: Mutex<VecDeque<i16>>,
    capacity: usize,
}

pub struct AudioRingBuffer {
    inner: Arc<Inner>,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
            }),
        }
    }

    /// Split into a producer/consumer pair sharing the same backing queue.
    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        let inner = self.inner;
        (
            AudioProducer {
                inner: inner.clone(),
            },
            AudioConsumer { inner },
        )
    }
}

pub struct AudioProducer {
    inner: Arc<Inner>,
}

impl AudioProducer {
    /// Writes `data`, never blocking and never rejecting: if there isn't
    /// room, the oldest queued samples are evicted to make space (per
    /// spec.md §4.1's backpressure policy — drop the oldest queued frame
    /// rather than block the capture callback). Returns the number of
    /// samples dropped to make room, so the caller can feed a
    /// dropped-frame counter.
    pub fn write(&mut self, data: &[i16]) -> Result<usize, AudioError> {
        let mut queue = self.inner.queue.lock();
        if data.len() > self.inner.capacity {
            // A single write larger than the whole buffer: keep only its
            // tail and count everything else as dropped.
            let dropped = data.len() - self.inner.capacity;
            queue.clear();
            queue.extend(data[dropped..].iter().copied());
            return Ok(dropped);
        }
        let free = self.inner.capacity - queue.len();
        let mut dropped = 0;
        if data.len() > free {
            dropped = data.len() - free;
            for _ in 0..dropped {
                queue.pop_front();
            }
        }
        queue.extend(data.iter().copied());
        Ok(dropped)
    }

    /// Free capacity remaining, in samples.
    pub fn slots(&self) -> usize {
        let queue = self.inner.queue.lock();
        self.inner.capacity - queue.len()
    }
}

pub struct AudioConsumer {
    inner: Arc<Inner>,
}

impl AudioConsumer {
    /// Reads up to `buf.len()` samples, returning the count actually read.
    pub fn read(&mut self, buf: &mut [i16]) -> usize {
        let mut queue = self.inner.queue.lock();
        let n = buf.len().min(queue.len());
        for slot in buf.iter_mut().take(n) {
            *slot = queue.pop_front().expect("checked len above");
        }
        n
    }

    /// Samples currently queued.
    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
