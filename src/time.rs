//! Monotonic wall-clock nanosecond timestamps, used for `Sample::timestamp_ns`
//! and the profile envelope's `start_time`/`end_time`.
//!
//! Mirrors the lazy-timebase pattern in `mac/time.rs`
//! (`OnceLock<mach_timebase_info>` plus `mach_absolute_time`), but needs no
//! platform-specific timebase conversion since `std::time::Instant` is
//! already nanosecond-resolution monotonic on every target this crate
//! supports.

use std::sync::OnceLock;
use std::time::Instant;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

pub fn monotonic_now_ns() -> i64 {
    let start = PROCESS_START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as i64
}
