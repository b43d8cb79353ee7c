//! Core of a sampling CPU profiler meant to be embedded inside a managed
//! runtime host process.
//!
//! This crate owns the sampling loop, the JIT code map, the raw-sample
//! ring buffer, and the symbolizer; it knows nothing about any particular
//! managed runtime, wire format, or on-disk layout. An embedder implements
//! [`Host`](host::Host) to supply interrupts, stack capture, an idle-task
//! queue, and code-event delivery, then drives a [`CpuProfiler`] through
//! its lifecycle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use cpu_profiler_core::{CpuProfiler, CpuProfilerConfig, Host};
//!
//! fn run(host: Arc<dyn Host>) {
//!     let profiler = CpuProfiler::attach(host, CpuProfilerConfig::default());
//!     profiler.start(100.0).expect("positive frequency");
//!     // ... time passes, samples accumulate ...
//!     let profile = profiler.get_profile();
//!     profiler.stop();
//!     let _ = profile;
//! }
//! ```

mod clock;
mod code_map;
mod error;
mod host;
mod labels;
mod profiler;
mod registry;
mod ring_buffer;
mod sample;
mod sampler_thread;
mod symbolizer;
mod time;
mod types;

pub use code_map::CodeEventRecord;
pub use error::{ProfilerError, Result};
pub use host::{Host, HostId, IdleCallback, InterruptCallback, TeardownCallback};
pub use labels::Labels;
pub use profiler::{CpuProfiler, CpuProfilerConfig, Profile};
pub use sample::{Location, Sample, MAX_FRAMES};

#[cfg(feature = "test-support")]
pub use host::test_support::MockHost;
