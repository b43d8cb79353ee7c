use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::CpuClock;
use crate::code_map::CodeMap;
use crate::error::{ProfilerError, Result};
use crate::host::Host;
use crate::labels::Labels;
use crate::registry;
use crate::ring_buffer::RingBuffer;
use crate::sample::{FramePool, RawSample, Sample, MAX_FRAMES};
use crate::sampler_thread::SamplerThread;
use crate::symbolizer::SymbolizerWorker;
use crate::time::monotonic_now_ns;

/// Properties the embedding host supplies at construction. There is no
/// CLI, environment variable, or on-disk config format involved — the
/// embedder is the only source of configuration.
#[derive(Debug, Clone, Copy)]
pub struct CpuProfilerConfig {
    pub ring_capacity: usize,
}

impl Default for CpuProfilerConfig {
    fn default() -> Self {
        CpuProfilerConfig {
            ring_capacity: RingBuffer::<()>::DEFAULT_CAPACITY,
        }
    }
}

/// A packaged snapshot of everything captured since the previous
/// `get_profile` call: a name, the covered time range, and the samples.
#[derive(Debug)]
pub struct Profile {
    pub name: String,
    pub start_time_ns: i64,
    pub end_time_ns: i64,
    pub samples: Vec<Sample>,
}

/// Facade: lifecycle, frequency, labels, sample array, profile packaging.
pub struct CpuProfiler {
    host: Arc<dyn Host>,
    code_map: Arc<CodeMap>,

    running: AtomicBool,
    frequency_hz: Mutex<f64>,
    start_time_ns: Mutex<i64>,
    sampler: Mutex<Option<SamplerThread>>,

    clock: Mutex<CpuClock>,
    labels: Mutex<Option<Labels>>,

    raw_samples: Arc<Mutex<RingBuffer<RawSample>>>,
    output: Arc<Mutex<Vec<Sample>>>,
    frame_pool: Arc<FramePool>,
}

impl CpuProfiler {
    /// Attaches a new profiler to `host`, sharing `host`'s `CodeMap` with
    /// any other profiler already attached to it.
    pub fn attach(host: Arc<dyn Host>, config: CpuProfilerConfig) -> Arc<Self> {
        let code_map = registry::code_map_for_host(&host);

        let profiler = Arc::new(CpuProfiler {
            host: Arc::clone(&host),
            code_map,
            running: AtomicBool::new(false),
            frequency_hz: Mutex::new(0.0),
            start_time_ns: Mutex::new(0),
            sampler: Mutex::new(None),
            clock: Mutex::new(CpuClock::new()),
            labels: Mutex::new(None),
            raw_samples: Arc::new(Mutex::new(RingBuffer::new(config.ring_capacity))),
            output: Arc::new(Mutex::new(Vec::new())),
            frame_pool: Arc::new(FramePool::new()),
        });

        // A weak back-reference so this hook doesn't itself keep the
        // profiler alive; stops and joins the sampler thread at host
        // teardown before anything else can tear down shared state.
        let weak_profiler = Arc::downgrade(&profiler);
        host.register_teardown_hook(Box::new(move || {
            if let Some(profiler) = weak_profiler.upgrade() {
                profiler.stop();
            }
        }));

        profiler
    }

    pub fn attach_with_default_config(host: Arc<dyn Host>) -> Arc<Self> {
        Self::attach(host, CpuProfilerConfig::default())
    }

    /// Idempotent: a second `Start` while already running is a no-op and
    /// does not change the frequency.
    pub fn start(self: &Arc<Self>, hz: f64) -> Result<()> {
        if !(hz.is_finite() && hz > 0.0) {
            return Err(ProfilerError::InvalidFrequency(hz));
        }
        // A validly finite and positive `hz` can still be small enough that
        // `1.0 / hz` isn't a representable `Duration` (e.g. 1e-300): reject
        // that up front rather than panicking inside `SamplerThread::start`.
        let interval = Duration::try_from_secs_f64(1.0 / hz)
            .map_err(|_| ProfilerError::InvalidFrequency(hz))?;

        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        *self.frequency_hz.lock() = hz;
        *self.start_time_ns.lock() = monotonic_now_ns();
        // Rebase the CPU clock so the first sample's delta covers only
        // time spent while actually running, not whatever elapsed since
        // `attach` or a previous `stop`.
        *self.clock.lock() = CpuClock::new();
        self.code_map.enable(&self.host);

        // Weak, not a strong `Arc` clone: the sampler thread outlives every
        // external handle to `self`, so a strong capture here would keep
        // `self` alive forever and `Drop` would never run to join it back.
        let weak_profiler = Arc::downgrade(self);
        let host_for_interrupts = Arc::clone(&self.host);
        let sampler = SamplerThread::start(interval, move || {
            let weak_profiler = weak_profiler.clone();
            host_for_interrupts.request_interrupt(Box::new(move || {
                if let Some(profiler) = weak_profiler.upgrade() {
                    profiler.capture_sample();
                }
            }));
        });

        *self.sampler.lock() = Some(sampler);
        Ok(())
    }

    /// Idempotent: stopping an already-stopped profiler is a no-op.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        if let Some(mut sampler) = self.sampler.lock().take() {
            sampler.stop();
        }
        self.code_map.disable(&self.host);
    }

    /// The capture path. Runs from interrupt context: reads
    /// the CPU-time delta, captures a raw stack into a fixed-size buffer,
    /// pushes a `RawSample` onto the ring (dropping it silently if full),
    /// and always schedules a symbolizer wake so other pending samples
    /// still get drained.
    pub fn capture_sample(self: &Arc<Self>) {
        let cpu_time_ns = self.clock.lock().diff(None);

        let mut stack_buf = [0usize; MAX_FRAMES];
        let frames_count = self.host.capture_stack(&mut stack_buf);

        let mut frames = self.frame_pool.acquire();
        frames.clear();
        frames.extend_from_slice(&stack_buf[..frames_count]);

        let labels = self.labels.lock().clone();
        let timestamp_ns = monotonic_now_ns();

        let raw_sample = RawSample {
            labels,
            frames,
            cpu_time_ns,
            timestamp_ns,
        };

        if let Err(rejected) = self.raw_samples.lock().push_back(raw_sample) {
            log::warn!("CpuProfiler: ring buffer full, dropping raw sample");
            self.frame_pool.release(rejected.frames);
        }

        let this = Arc::clone(self);
        self.host.post_idle_task(Box::new(move || {
            this.process_sample();
        }));
    }

    /// Drains the raw-sample ring into the symbolized output array.
    /// Called from host-idle context; safe to call redundantly (draining
    /// an empty ring is a no-op).
    pub fn process_sample(&self) -> usize {
        let worker = SymbolizerWorker::new(
            Arc::clone(&self.code_map),
            Arc::clone(&self.raw_samples),
            Arc::clone(&self.output),
            Arc::clone(&self.frame_pool),
        );
        worker.run()
    }

    pub fn set_labels(&self, labels: Option<Labels>) {
        *self.labels.lock() = labels;
    }

    pub fn get_labels(&self) -> Option<Labels> {
        self.labels.lock().clone()
    }

    /// Current configured frequency, or 0 if stopped.
    pub fn get_frequency(&self) -> f64 {
        if self.running.load(Ordering::Acquire) {
            *self.frequency_hz.lock()
        } else {
            0.0
        }
    }

    /// Current output sequence, then clears it.
    pub fn get_samples(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.output.lock())
    }

    pub fn get_sample_count(&self) -> usize {
        self.output.lock().len()
    }

    /// `{start_time, end_time, samples}`; advances `start_time` to
    /// `end_time` so back-to-back calls produce disjoint time ranges.
    pub fn get_profile(&self) -> Profile {
        let end_time_ns = monotonic_now_ns();
        let samples = self.get_samples();
        let mut start_time_ns = self.start_time_ns.lock();
        let profile = Profile {
            name: "(root)".to_string(),
            start_time_ns: *start_time_ns,
            end_time_ns,
            samples,
        };
        *start_time_ns = end_time_ns;
        profile
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for CpuProfiler {
    fn drop(&mut self) {
        // Even if a caller forgot to `stop()`, the sampler thread must be
        // joined before the fields it (indirectly, via the host) might
        // reach through are gone.
        self.stop();
    }
}
