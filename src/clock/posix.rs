//! POSIX backend: `clock_gettime(CLOCK_THREAD_CPUTIME_ID, ..)`.

pub fn now_ns() -> i64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        log::debug!("clock_gettime(CLOCK_THREAD_CPUTIME_ID) failed, reporting zero");
        return 0;
    }
    ts.tv_sec as i64 * 1_000_000_000 + ts.tv_nsec as i64
}
