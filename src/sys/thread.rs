use syscalls::{raw_syscall, Sysno};

/// Returns the kernel id of the calling thread.
pub fn current_thread_id() -> u32 {
    // gettid cannot fail and always returns a positive pid_t.
    unsafe { raw_syscall!(Sysno::gettid) as u32 }
}
