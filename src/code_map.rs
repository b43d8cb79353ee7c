use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::Host;

/// Immutable descriptor of a JIT-emitted code region. The three name
/// fields are `Arc<str>` rather than `String`: every patch of
/// `script_id` rebuilds the whole record so that an `Arc<CodeEventRecord>`
/// already handed out to a symbolized sample stays a frozen snapshot, and
/// `Arc<str>` makes that rebuild a handful of refcount bumps instead of
/// three string copies.
///
/// Equality compares every field, including `script_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEventRecord {
    pub script_id: i32,
    pub address: u64,
    pub previous_address: u64,
    pub size: u64,
    pub line: i32,
    pub column: i32,
    pub comment: Arc<str>,
    pub function_name: Arc<str>,
    pub script_name: Arc<str>,
}

impl CodeEventRecord {
    pub fn new(address: u64, size: u64, function_name: impl Into<Arc<str>>) -> Self {
        CodeEventRecord {
            script_id: 0,
            address,
            previous_address: 0,
            size,
            line: 0,
            column: 0,
            comment: Arc::from(""),
            function_name: function_name.into(),
            script_name: Arc::from(""),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    fn contains(&self, query: u64) -> bool {
        query >= self.address && query < self.address.saturating_add(self.size)
    }
}

/// Ordered map from code start address to descriptor, supporting
/// address-range lookup, relocation and removal, driven by host
/// code-event callbacks.
///
/// Enable/disable is reference-counted so that multiple `CpuProfiler`s
/// attached to the same host runtime can share a single `CodeMap`: the
/// first `enable` subscribes to the host's code events, the last
/// matching `disable` unsubscribes and clears all entries.
pub struct CodeMap {
    records: Mutex<BTreeMap<u64, Arc<CodeEventRecord>>>,
    enable_count: AtomicUsize,
}

impl CodeMap {
    pub fn new() -> Arc<Self> {
        Arc::new(CodeMap {
            records: Mutex::new(BTreeMap::new()),
            enable_count: AtomicUsize::new(0),
        })
    }

    /// A structured "function compiled" or "function removed" event.
    /// `address == 0` records are never accepted (data-model invariant).
    pub fn insert(&self, record: CodeEventRecord) {
        if record.address == 0 {
            log::debug!("CodeMap::insert: ignoring record with null address");
            return;
        }
        log::debug!(
            "CodeMap::insert address={:#x} size={} fn={}",
            record.address,
            record.size,
            record.function_name
        );
        self.records.lock().insert(record.address, Arc::new(record));
    }

    /// A structured "function relocated" event: erase the record at
    /// `new_record.previous_address` (if any) before inserting the new
    /// record at `new_record.address`.
    pub fn relocate(&self, new_record: CodeEventRecord) {
        if new_record.address == 0 {
            return;
        }
        let mut records = self.records.lock();
        if new_record.previous_address != 0 {
            records.remove(&new_record.previous_address);
        }
        log::debug!(
            "CodeMap::relocate {:#x} -> {:#x}",
            new_record.previous_address,
            new_record.address
        );
        records.insert(new_record.address, Arc::new(new_record));
    }

    /// A structured "function removed" event.
    pub fn remove(&self, address: u64) {
        log::debug!("CodeMap::remove address={:#x}", address);
        self.records.lock().remove(&address);
    }

    /// A raw JIT event: patch the `script_id` of the record already at
    /// `address`, if one exists. No-op if nothing is known at that
    /// address yet (the structured event that created the record may not
    /// have arrived yet). Rebuilds the record rather than mutating it in
    /// place so an `Arc<CodeEventRecord>` already captured by an earlier,
    /// already-symbolized sample keeps the `script_id` it had when it was
    /// captured.
    pub fn set_script_id(&self, address: u64, script_id: i32) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(&address) {
            if record.script_id != script_id {
                *record = Arc::new(CodeEventRecord {
                    script_id,
                    ..(**record).clone()
                });
            }
        }
    }

    /// Returns the unique record `R` such that `R.address <= query <
    /// R.address + R.size`, or `None`.
    ///
    /// Implemented as an ordered-map lookup for the greatest key `<=
    /// query` (a single predecessor step after an upper-bound search),
    /// which is O(log N).
    pub fn lookup(&self, query: u64) -> Option<Arc<CodeEventRecord>> {
        let records = self.records.lock();
        let (_, candidate) = records.range(..=query).next_back()?;
        if candidate.contains(query) {
            Some(Arc::clone(candidate))
        } else {
            None
        }
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Increments the enable refcount; subscribes to the host's code
    /// events on the 0 -> 1 transition.
    pub fn enable(self: &Arc<Self>, host: &Arc<dyn Host>) {
        if self.enable_count.fetch_add(1, Ordering::AcqRel) == 0 {
            log::debug!("CodeMap: enabling (subscribing to host code events)");
            host.subscribe_code_events(Arc::clone(self));
        }
    }

    /// Decrements the enable refcount; unsubscribes and clears all
    /// entries on the N -> 0 transition.
    pub fn disable(self: &Arc<Self>, host: &Arc<dyn Host>) {
        let previous = self.enable_count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            n.checked_sub(1)
        });
        if previous == Ok(1) {
            log::debug!("CodeMap: disabling (unsubscribing, clearing entries)");
            host.unsubscribe_code_events(self);
            self.clear();
        }
    }
}
