//! Exercises the full attach -> start -> capture -> symbolize -> profile
//! pipeline against a mock host, the way a real embedder would drive it.

use cpu_profiler_core::{CpuProfiler, CpuProfilerConfig, Host, Labels, MockHost};
use std::sync::Arc;

#[test]
fn capture_through_profile_round_trip() {
    let _ = env_logger::try_init();

    let host = MockHost::new();
    let profiler = CpuProfiler::attach(
        Arc::clone(&host) as Arc<dyn Host>,
        CpuProfilerConfig { ring_capacity: 4 },
    );

    assert_eq!(profiler.get_frequency(), 0.0, "not started yet");
    // `Start` subscribes the shared `CodeMap` to the host's code events;
    // pick a low frequency so the background sampler thread's own ticks
    // can't race the manual `capture_sample` call below.
    profiler.start(1.0).unwrap();

    // The host delivers a "function compiled" event before anything can
    // resolve against it.
    host.deliver_code_event(0x1000, 0x40, "hot_loop");

    host.set_next_stack(vec![0x1010]);

    let request_id = Labels::new(String::from("req-42"));
    profiler.set_labels(Some(request_id.clone()));

    profiler.capture_sample();

    // MockHost runs interrupts and idle tasks synchronously, so the
    // sample is already symbolized.
    assert_eq!(profiler.get_sample_count(), 1);

    let profile = profiler.get_profile();
    assert_eq!(profile.name, "(root)");
    assert_eq!(profile.samples.len(), 1);
    let sample = &profile.samples[0];
    assert_eq!(sample.locations.len(), 1);
    assert_eq!(sample.locations[0].function_name(), "hot_loop");
    assert!(sample.labels.as_ref().unwrap().same_handle(&request_id));

    assert_eq!(profiler.get_sample_count(), 0, "get_profile drains the output array");

    let second = profiler.get_profile();
    assert_eq!(second.start_time_ns, profile.end_time_ns);
    assert!(second.samples.is_empty());

    profiler.stop();
    assert_eq!(profiler.get_frequency(), 0.0, "stopped profiler reports 0 Hz");
}

#[test]
fn host_teardown_stops_the_profiler() {
    let host = MockHost::new();
    let profiler = CpuProfiler::attach(
        Arc::clone(&host) as Arc<dyn Host>,
        CpuProfilerConfig::default(),
    );
    profiler.start(50.0).unwrap();
    assert!(profiler.is_running());

    host.run_teardown_hooks();
    assert!(!profiler.is_running());
}

#[test]
fn unresolvable_samples_are_dropped_but_do_not_panic() {
    let host = MockHost::new();
    let profiler = CpuProfiler::attach(
        Arc::clone(&host) as Arc<dyn Host>,
        CpuProfilerConfig::default(),
    );

    host.set_next_stack(vec![0xdead_beef]);
    profiler.capture_sample();
    assert_eq!(profiler.get_sample_count(), 0);
}
