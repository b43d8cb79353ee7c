//! Windows backend: `GetThreadTimes` on the current thread's pseudo
//! handle, summing kernel + user `FILETIME`s and converting the native
//! 100 ns tick unit to nanoseconds.

use windows::Win32::Foundation::FILETIME;
use windows::Win32::System::Threading::{GetCurrentThread, GetThreadTimes};

fn filetime_to_ticks(ft: FILETIME) -> u64 {
    ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64
}

pub fn now_ns() -> i64 {
    let mut creation_time = FILETIME::default();
    let mut exit_time = FILETIME::default();
    let mut kernel_time = FILETIME::default();
    let mut user_time = FILETIME::default();

    let ok = unsafe {
        GetThreadTimes(
            GetCurrentThread(),
            &mut creation_time,
            &mut exit_time,
            &mut kernel_time,
            &mut user_time,
        )
    };
    if ok.is_err() {
        log::debug!("GetThreadTimes failed, reporting zero");
        return 0;
    }

    let ticks_100ns = filetime_to_ticks(kernel_time) + filetime_to_ticks(user_time);
    (ticks_100ns * 100) as i64
}
