//! The interfaces this core consumes from its embedding host runtime. A
//! concrete embedder (a JS engine, a VM, ...) implements `Host`; this
//! crate never assumes a particular runtime.

use std::sync::Arc;

use crate::code_map::CodeMap;

/// Stable identity of a host runtime instance, used as the key into
/// `PerHostRegistry`. A real embedder typically derives this from the
/// address of its own runtime/isolate object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(pub u64);

pub type InterruptCallback = Box<dyn FnOnce() + Send + 'static>;
pub type IdleCallback = Box<dyn FnOnce() + Send + 'static>;
pub type TeardownCallback = Box<dyn FnOnce() + Send + 'static>;

/// The primitives a host runtime must provide for this core to attach to
/// it.
pub trait Host: Send + Sync + 'static {
    /// Stable identity for this host runtime instance.
    fn host_id(&self) -> HostId;

    /// Run `callback` on the primary execution thread as soon as it is
    /// safe to do so. Must not block indefinitely; the sampler thread
    /// calls this once per tick and must remain free to notice `Stop`.
    fn request_interrupt(&self, callback: InterruptCallback);

    /// Write up to `buf.len()` return-address pointers into `buf`,
    /// innermost-first, and return the count written. May be called only
    /// from within an interrupt callback.
    fn capture_stack(&self, buf: &mut [usize]) -> usize;

    /// Schedule `callback` to run once, the next time the host's event
    /// loop is idle.
    fn post_idle_task(&self, callback: IdleCallback);

    /// Wire `code_map` up to receive this host's code-event stream
    /// (structured compiled/relocated/removed events and raw JIT
    /// address/script-id events).
    fn subscribe_code_events(&self, code_map: Arc<CodeMap>);

    /// Undo a prior `subscribe_code_events` for the same `code_map`.
    fn unsubscribe_code_events(&self, code_map: &Arc<CodeMap>);

    /// Register a callback to run once at host-runtime teardown. The
    /// callback must be able to run even if the registrant has since
    /// stopped caring about host events.
    fn register_teardown_hook(&self, hook: TeardownCallback);
}

/// Test and documentation support: a `Host` that drives everything
/// synchronously, on the calling thread, with no real interrupts. This
/// lets the rest of the crate be exercised end to end without a real
/// managed runtime.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU64;

    pub struct MockHost {
        code_maps: Mutex<Vec<Arc<CodeMap>>>,
        teardown_hooks: Mutex<Vec<TeardownCallback>>,
        next_stack: Mutex<Vec<usize>>,
        id: HostId,
    }

    // `PerHostRegistry` keys its entries by `HostId` in one process-wide
    // static, and every test binary using `MockHost::new()` shares it, so
    // each instance needs an id nobody else — in this run, in any file —
    // will pick. Starts well above the small hand-picked ids a few tests
    // construct directly via `with_id` so the two ranges never collide.
    static NEXT_ID: AtomicU64 = AtomicU64::new(10_000);

    impl MockHost {
        pub fn new() -> Arc<Self> {
            Self::with_id(NEXT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
        }

        pub fn with_id(id: u64) -> Arc<Self> {
            Arc::new(MockHost {
                code_maps: Mutex::new(Vec::new()),
                teardown_hooks: Mutex::new(Vec::new()),
                next_stack: Mutex::new(Vec::new()),
                id: HostId(id),
            })
        }

        /// Sets the frame addresses the next `capture_stack` call will
        /// report, innermost-first.
        pub fn set_next_stack(&self, frames: Vec<usize>) {
            *self.next_stack.lock() = frames;
        }

        /// Runs every registered teardown hook, as process shutdown would.
        pub fn run_teardown_hooks(&self) {
            let hooks = std::mem::take(&mut *self.teardown_hooks.lock());
            for hook in hooks {
                hook();
            }
        }

        pub fn code_map_count(&self) -> usize {
            self.code_maps.lock().len()
        }

        /// Convenience for tests: delivers a "function compiled" event
        /// straight to every `CodeMap` currently subscribed, as the real
        /// host would via its own code-event stream.
        pub fn deliver_code_event(&self, address: u64, size: u64, function_name: &str) {
            let record = crate::code_map::CodeEventRecord::new(address, size, function_name);
            for code_map in self.code_maps.lock().iter() {
                code_map.insert(record.clone());
            }
        }
    }

    impl Host for MockHost {
        fn host_id(&self) -> HostId {
            self.id
        }

        fn request_interrupt(&self, callback: InterruptCallback) {
            // Safe "as soon as possible" in the mock is "right now".
            callback();
        }

        fn capture_stack(&self, buf: &mut [usize]) -> usize {
            let frames = self.next_stack.lock();
            let n = frames.len().min(buf.len());
            buf[..n].copy_from_slice(&frames[..n]);
            n
        }

        fn post_idle_task(&self, callback: IdleCallback) {
            callback();
        }

        fn subscribe_code_events(&self, code_map: Arc<CodeMap>) {
            self.code_maps.lock().push(code_map);
        }

        fn unsubscribe_code_events(&self, code_map: &Arc<CodeMap>) {
            self.code_maps
                .lock()
                .retain(|m| !Arc::ptr_eq(m, code_map));
        }

        fn register_teardown_hook(&self, hook: TeardownCallback) {
            self.teardown_hooks.lock().push(hook);
        }
    }
}
