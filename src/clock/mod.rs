//! Per-thread CPU-time clock.
//!
//! Three backends converge on the same contract: a monotonic nanosecond
//! reading of the calling thread's own CPU time (user + kernel), returning
//! zero rather than failing when the platform call errors out. The
//! backend is picked at compile time behind a `cfg_if!` gate, one module
//! per target family.

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        mod mach;
        use mach::now_ns;
    } else if #[cfg(windows)] {
        mod windows;
        use windows::now_ns;
    } else {
        mod posix;
        use posix::now_ns;
    }
}

/// Reads the calling thread's own CPU time and computes diffs since the
/// last read.
pub struct CpuClock {
    last: i64,
}

impl CpuClock {
    /// `last` starts at construction time.
    pub fn new() -> Self {
        CpuClock { last: now_ns() }
    }

    /// Current thread CPU time, in nanoseconds. Returns 0 if the
    /// underlying platform call fails; never panics.
    pub fn now(&self) -> i64 {
        now_ns()
    }

    /// Returns `t - last`, then sets `last = t`. `t` defaults to `now()`.
    pub fn diff(&mut self, t: Option<i64>) -> i64 {
        let t = t.unwrap_or_else(|| self.now());
        let delta = t - self.last;
        self.last = t;
        delta
    }
}

impl Default for CpuClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic_on_the_same_thread() {
        let clock = CpuClock::new();
        let a = clock.now();
        // Burn a little CPU so the second reading isn't trivially equal
        // due to clock resolution, though `>=` is all that is required.
        let mut acc: u64 = 0;
        for i in 0..100_000u64 {
            acc = acc.wrapping_add(i);
        }
        std::hint::black_box(acc);
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn diff_of_two_seconds_and_one_nanosecond() {
        let mut clock = CpuClock::new();
        let t0 = clock.now();
        clock.last = t0;
        let t1 = t0 + 2_000_000_001;
        assert_eq!(clock.diff(Some(t1)), 2_000_000_001);
    }

    #[test]
    fn diff_across_whole_seconds_and_nanoseconds() {
        let mut clock = CpuClock::new();
        // t0 = 2s + 1ns, t1 = 4s + 3ns
        clock.last = 2 * 1_000_000_000 + 1;
        let t1 = 4 * 1_000_000_000 + 3;
        assert_eq!(clock.diff(Some(t1)), 2_000_000_002);
    }

    #[test]
    fn diff_updates_last_so_back_to_back_diffs_dont_double_count() {
        let mut clock = CpuClock::new();
        clock.last = 1_000;
        assert_eq!(clock.diff(Some(1_500)), 500);
        assert_eq!(clock.diff(Some(1_500)), 0);
    }
}
