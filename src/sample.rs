use std::sync::Arc;

use parking_lot::Mutex;

use crate::code_map::CodeEventRecord;
use crate::labels::Labels;

/// A resolved stack location; an alias for the `CodeEventRecord` the
/// address was found at, since whatever type an embedder's serializer
/// consumes needs exactly `CodeEventRecord`'s fields.
pub type Location = Arc<CodeEventRecord>;

/// The maximum number of return-address pointers a single capture may
/// hold; a stack deeper than this is truncated at the limit.
pub const MAX_FRAMES: usize = 255;

/// Captured at interrupt time. Exclusively owned by whichever of
/// {capture path, ring buffer, symbolizer worker} currently holds it;
/// ownership moves on each hop.
pub struct RawSample {
    pub labels: Option<Labels>,
    /// Raw instruction pointers, innermost-first, as the host's stack
    /// sampler wrote them.
    pub frames: Vec<usize>,
    /// Signed nanosecond CPU-time delta since this profiler's last
    /// capture.
    pub cpu_time_ns: i64,
    /// Monotonic nanoseconds, recorded at capture time.
    pub timestamp_ns: i64,
}

/// A raw sample whose frame pointers have been resolved through a
/// `CodeMap`. `locations` is outermost-first, matching human call-stack
/// order (see `symbolizer::symbolize`).
pub struct Sample {
    pub labels: Option<Labels>,
    pub cpu_time_ns: i64,
    pub timestamp_ns: i64,
    pub locations: Vec<Location>,
}

/// A small free-list of recycled frame buffers, so the capture path
/// (which must not allocate on its slow path) can reuse a `Vec<usize>`
/// instead of allocating one per capture.
pub struct FramePool {
    free: Mutex<Vec<Vec<usize>>>,
}

impl FramePool {
    /// Caps how many idle buffers are retained; beyond this, released
    /// buffers are simply dropped instead of pooled.
    const MAX_POOLED: usize = 16;

    pub fn new() -> Self {
        FramePool {
            free: Mutex::new(Vec::new()),
        }
    }

    /// Hands out a buffer with at least `MAX_FRAMES` capacity, reused
    /// from the pool if one is available.
    pub fn acquire(&self) -> Vec<usize> {
        let mut free = self.free.lock();
        free.pop().unwrap_or_else(|| Vec::with_capacity(MAX_FRAMES))
    }

    /// Returns a buffer to the pool for reuse by a future `acquire`.
    pub fn release(&self, mut buf: Vec<usize>) {
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < Self::MAX_POOLED {
            free.push(buf);
        }
    }
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_reuses_released_buffers() {
        let pool = FramePool::new();
        let mut buf = pool.acquire();
        buf.extend_from_slice(&[1, 2, 3]);
        let cap = buf.capacity();
        pool.release(buf);

        let reused = pool.acquire();
        assert!(reused.is_empty(), "released buffer must come back cleared");
        assert!(reused.capacity() >= cap);
    }

    #[test]
    fn pool_caps_retained_buffers() {
        let pool = FramePool::new();
        for _ in 0..(FramePool::MAX_POOLED + 4) {
            pool.release(Vec::new());
        }
        assert_eq!(pool.free.lock().len(), FramePool::MAX_POOLED);
    }
}
