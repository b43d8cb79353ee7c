use std::cell::Cell;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::code_map::CodeMap;
use crate::host::{Host, HostId};
use crate::types::FastHashMap;

/// Process-wide mapping from host-runtime identity to that host's shared
/// `CodeMap`. Entries are installed lazily on first use and removed by a
/// teardown hook registered on the host at that time; access is
/// serialized by one process-wide mutex, but lookups after insertion
/// need no further locking beyond that mutex since the stored
/// `Arc<CodeMap>` has a stable address for its lifetime.
struct PerHostRegistry {
    entries: Mutex<FastHashMap<HostId, Arc<CodeMap>>>,
}

static REGISTRY: OnceLock<PerHostRegistry> = OnceLock::new();

fn registry() -> &'static PerHostRegistry {
    REGISTRY.get_or_init(|| PerHostRegistry {
        entries: Mutex::new(FastHashMap::default()),
    })
}

/// Returns the `CodeMap` shared by every `CpuProfiler` attached to
/// `host`, creating and registering it on first use.
pub fn code_map_for_host(host: &Arc<dyn Host>) -> Arc<CodeMap> {
    let id = host.host_id();

    {
        let entries = registry().entries.lock();
        if let Some(existing) = entries.get(&id) {
            return Arc::clone(existing);
        }
    }

    let fresh_map = CodeMap::new();
    let inserted = Cell::new(false);
    let map = {
        let mut entries = registry().entries.lock();
        // Another thread may have raced us; prefer whatever is already
        // there so there is only ever one `CodeMap` per host.
        Arc::clone(entries.entry(id).or_insert_with(|| {
            inserted.set(true);
            fresh_map
        }))
    };

    // Only the caller that actually won the race installs the teardown
    // hook, so each registry entry gets exactly one.
    if inserted.get() {
        host.register_teardown_hook(Box::new(move || {
            log::debug!("PerHostRegistry: tearing down host {:?}", id);
            registry().entries.lock().remove(&id);
        }));
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_support::MockHost;

    // Each test below picks a `HostId` nobody else in this module uses.
    // `PerHostRegistry` is one process-wide static, shared by every test
    // in this binary, so two tests whose hosts share an id would corrupt
    // each other's registry entry when run concurrently.

    #[test]
    fn same_host_gets_the_same_code_map() {
        let host: Arc<dyn Host> = MockHost::with_id(1);
        let a = code_map_for_host(&host);
        let b = code_map_for_host(&host);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_hosts_get_different_code_maps() {
        let host_a: Arc<dyn Host> = MockHost::with_id(10);
        let host_b: Arc<dyn Host> = MockHost::with_id(20);

        let map_a = code_map_for_host(&host_a);
        let map_b = code_map_for_host(&host_b);
        assert!(!Arc::ptr_eq(&map_a, &map_b));
    }

    #[test]
    fn teardown_hook_removes_the_entry() {
        let host = MockHost::with_id(30);
        let host_dyn: Arc<dyn Host> = host.clone();
        let map = code_map_for_host(&host_dyn);
        map.insert(crate::code_map::CodeEventRecord::new(1, 1, "f"));

        host.run_teardown_hooks();

        let host_dyn2: Arc<dyn Host> = host.clone();
        let map2 = code_map_for_host(&host_dyn2);
        assert_eq!(map2.len(), 0, "teardown must have dropped the old CodeMap's entry");
    }
}
