use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::code_map::CodeMap;
use crate::ring_buffer::RingBuffer;
use crate::sample::{FramePool, RawSample, Sample};

/// Resolves every frame address in `raw` through `code_map`, building an
/// outermost-first location sequence. Unresolvable addresses are
/// skipped; if nothing resolves, the whole sample is dropped as not
/// useful.
///
/// Always hands back the raw frame buffer (whether or not the sample
/// survived) so the caller can return it to a `FramePool`.
pub fn symbolize(mut raw: RawSample, code_map: &CodeMap) -> (Option<Sample>, Vec<usize>) {
    let frames = std::mem::take(&mut raw.frames);

    let mut locations = VecDeque::with_capacity(frames.len());
    for &addr in &frames {
        if let Some(record) = code_map.lookup(addr as u64) {
            locations.push_front(record);
        }
    }

    if locations.is_empty() {
        log::warn!(
            "symbolizer: dropping sample with 0 resolvable frames out of {}",
            frames.len()
        );
        return (None, frames);
    }

    let sample = Sample {
        labels: raw.labels,
        cpu_time_ns: raw.cpu_time_ns,
        timestamp_ns: raw.timestamp_ns,
        locations: locations.into_iter().collect(),
    };
    (Some(sample), frames)
}

/// Cooperative task that runs on the host thread when it is idle,
/// draining raw captures into symbolized samples.
pub struct SymbolizerWorker {
    code_map: Arc<CodeMap>,
    raw_samples: Arc<Mutex<RingBuffer<RawSample>>>,
    output: Arc<Mutex<Vec<Sample>>>,
    frame_pool: Arc<FramePool>,
}

impl SymbolizerWorker {
    pub fn new(
        code_map: Arc<CodeMap>,
        raw_samples: Arc<Mutex<RingBuffer<RawSample>>>,
        output: Arc<Mutex<Vec<Sample>>>,
        frame_pool: Arc<FramePool>,
    ) -> Self {
        SymbolizerWorker {
            code_map,
            raw_samples,
            output,
            frame_pool,
        }
    }

    /// Drains every pending raw sample, symbolizing each and appending
    /// the result to the output array. Returns the number of symbolized
    /// samples appended (for tests; callers otherwise ignore it).
    pub fn run(&self) -> usize {
        let pending: Vec<RawSample> = {
            let mut ring = self.raw_samples.lock();
            ring.drain().collect()
        };

        let mut appended = 0;
        for raw in pending {
            let (sample, frame_buf) = symbolize(raw, &self.code_map);
            self.frame_pool.release(frame_buf);
            if let Some(sample) = sample {
                self.output.lock().push(sample);
                appended += 1;
            }
        }
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_map::CodeEventRecord;

    fn record(name: &str, address: u64, size: u64) -> CodeEventRecord {
        CodeEventRecord::new(address, size, name)
    }

    #[test]
    fn symbolize_orders_locations_outermost_first() {
        let map = CodeMap::new();
        map.insert(record("A", 1234, 10));
        map.insert(record("B", 2345, 10));

        let raw = RawSample {
            labels: None,
            frames: vec![1234, 2345], // innermost-first: A called from B
            cpu_time_ns: 10,
            timestamp_ns: 20,
        };

        let (sample, _buf) = symbolize(raw, &map);
        let sample = sample.unwrap();
        assert_eq!(sample.locations.len(), 2);
        assert_eq!(sample.locations[0].function_name(), "B");
        assert_eq!(sample.locations[1].function_name(), "A");
    }

    #[test]
    fn symbolize_skips_unresolvable_frames() {
        let map = CodeMap::new();
        map.insert(record("A", 1234, 10));

        let raw = RawSample {
            labels: None,
            frames: vec![9999, 1234],
            cpu_time_ns: 0,
            timestamp_ns: 0,
        };

        let (sample, _buf) = symbolize(raw, &map);
        let sample = sample.unwrap();
        assert_eq!(sample.locations.len(), 1);
        assert_eq!(sample.locations[0].function_name(), "A");
    }

    #[test]
    fn symbolize_drops_sample_with_no_resolvable_frames() {
        let map = CodeMap::new();
        let raw = RawSample {
            labels: None,
            frames: vec![1, 2, 3],
            cpu_time_ns: 0,
            timestamp_ns: 0,
        };
        let (sample, buf) = symbolize(raw, &map);
        assert!(sample.is_none());
        assert_eq!(buf.len(), 3, "frame buffer is handed back even when dropped");
    }

    #[test]
    fn worker_drains_ring_into_output() {
        let map = CodeMap::new();
        map.insert(record("A", 1234, 10));

        let ring = Arc::new(Mutex::new(RingBuffer::new(10)));
        ring.lock()
            .push_back(RawSample {
                labels: None,
                frames: vec![1234],
                cpu_time_ns: 5,
                timestamp_ns: 6,
            })
            .unwrap();

        let output = Arc::new(Mutex::new(Vec::new()));
        let worker = SymbolizerWorker::new(map, ring.clone(), output.clone(), Arc::new(FramePool::new()));

        assert_eq!(worker.run(), 1);
        assert_eq!(output.lock().len(), 1);
        assert!(ring.lock().is_empty());
    }
}
