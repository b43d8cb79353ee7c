//! macOS backend: read `thread_basic_info` off the calling thread's own
//! Mach thread port and sum user + system time. Mirrors the field
//! layout `mac/thread_info.rs` hand-derives from
//! `<mach/thread_info.h>`, and the read pattern
//! `mac/thread_profiler_in_process.rs::get_thread_cpu_time_since_thread_start`
//! uses for a *target* thread, specialized to the calling thread
//! (`mach_thread_self`) instead of a profiled target.
//!
//! `thread_info` the Mach trap is declared locally rather than taken
//! from `mach2::thread_act::thread_info`, the same workaround the
//! teacher applies for https://github.com/JohnTitor/mach2/issues/31.

use std::mem;

use mach2::mach_init::mach_thread_self;
use mach2::mach_port::mach_port_deallocate;
use mach2::message::mach_msg_type_number_t;
use mach2::port::mach_port_t;
use mach2::traps::mach_task_self;
use mach2::vm_types::{integer_t, natural_t};

type thread_act_t = mach_port_t;
type thread_flavor_t = i32;
type thread_info_t = *mut integer_t;
type kern_return_t = i32;

const KERN_SUCCESS: kern_return_t = 0;
const THREAD_BASIC_INFO: thread_flavor_t = 3;

#[repr(C)]
#[derive(Default)]
struct time_value {
    seconds: integer_t,
    microseconds: integer_t,
}

#[repr(C)]
#[derive(Default)]
struct thread_basic_info {
    user_time: time_value,
    system_time: time_value,
    cpu_usage: integer_t,
    policy: integer_t,
    run_state: integer_t,
    flags: integer_t,
    suspend_count: integer_t,
    sleep_time: integer_t,
}

const THREAD_BASIC_INFO_COUNT: mach_msg_type_number_t =
    (mem::size_of::<thread_basic_info>() / mem::size_of::<natural_t>()) as mach_msg_type_number_t;

extern "C" {
    fn thread_info(
        target_act: thread_act_t,
        flavor: thread_flavor_t,
        thread_info_out: thread_info_t,
        thread_info_out_count: *mut mach_msg_type_number_t,
    ) -> kern_return_t;
}

fn time_value_to_microseconds(tv: &time_value) -> i64 {
    tv.seconds as i64 * 1_000_000 + tv.microseconds as i64
}

pub fn now_ns() -> i64 {
    unsafe {
        let thread = mach_thread_self();
        let mut info: thread_basic_info = mem::zeroed();
        let mut count = THREAD_BASIC_INFO_COUNT;
        let kr = thread_info(
            thread,
            THREAD_BASIC_INFO,
            &mut info as *mut _ as thread_info_t,
            &mut count,
        );
        // mach_thread_self() hands back a send right we own.
        mach_port_deallocate(mach_task_self(), thread);

        if kr != KERN_SUCCESS {
            log::debug!("thread_info(THREAD_BASIC_INFO) failed, reporting zero");
            return 0;
        }

        let user_us = time_value_to_microseconds(&info.user_time);
        let sys_us = time_value_to_microseconds(&info.system_time);
        (user_us + sys_us) * 1_000
    }
}
