use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Background thread that periodically triggers a cooperative interrupt
/// on the host thread.
///
/// The loop never touches the output array, the ring buffer, or the
/// `CodeMap` directly — it only calls `on_tick`, which is expected to
/// request a host interrupt and return promptly. Sleep
/// overshoot (the interrupt request or the sleep itself running long) is
/// tracked and subtracted from the next sleep, the way
/// `perfrecord/src/sampler.rs`'s `sleep_and_save_overshoot` keeps the
/// loop's average period close to `1/hz` instead of drifting.
pub struct SamplerThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SamplerThread {
    pub fn start<F>(interval: Duration, on_tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let running_in_thread = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let mut last_overshoot = Duration::ZERO;
            while running_in_thread.load(Ordering::Acquire) {
                let tick_start = Instant::now();

                on_tick();

                let intended_wakeup = tick_start + interval;
                let wait = intended_wakeup.saturating_duration_since(Instant::now());
                let sleep_time = wait.checked_sub(last_overshoot).unwrap_or(Duration::ZERO);

                let before_sleep = Instant::now();
                thread::sleep(sleep_time);
                last_overshoot = Instant::now()
                    .saturating_duration_since(before_sleep)
                    .checked_sub(sleep_time)
                    .unwrap_or(Duration::ZERO);
            }
        });

        SamplerThread {
            running,
            handle: Some(handle),
        }
    }

    /// Flips the running flag and waits for the thread to exit (it exits
    /// after its current sleep, never mid-tick). Idempotent: calling
    /// `stop` twice, or after the thread already exited, is a no-op.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SamplerThread {
    fn drop(&mut self) {
        // Flip the flag and join before any field this thread might
        // still reference is torn down.
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn ticks_fire_roughly_at_the_configured_frequency() {
        let ticks = Arc::new(AtomicU32::new(0));
        let ticks_in_closure = Arc::clone(&ticks);

        let mut sampler =
            SamplerThread::start(Duration::from_millis(5), move || {
                ticks_in_closure.fetch_add(1, Ordering::SeqCst);
            });

        thread::sleep(Duration::from_millis(55));
        sampler.stop();

        let count = ticks.load(Ordering::SeqCst);
        assert!(count >= 5, "expected at least 5 ticks in ~55ms, got {count}");
    }

    #[test]
    fn stop_is_idempotent_and_joins_promptly() {
        let mut sampler = SamplerThread::start(Duration::from_millis(1), || {});
        sampler.stop();
        sampler.stop();
    }
}
