use core::sync::atomic::AtomicU32;
use syscalls::{syscall, Errno, Sysno};

/// Waits for a `futex_wake` operation to wake us.
///
/// Returns directly if the futex doesn't hold the expected value.
/// Spurious wakeups are possible, callers must re-check their condition.
pub fn futex_wait(futex: &AtomicU32, expected: u32) {
    use core::ptr::null;
    use core::sync::atomic::Ordering::Relaxed;

    loop {
        // No need to wait if the value already changed.
        if futex.load(Relaxed) != expected {
            return;
        }

        #[cfg(feature = "not_process_private")]
        let op = nc::FUTEX_WAIT;
        #[cfg(not(feature = "not_process_private"))]
        let op = nc::FUTEX_WAIT | nc::FUTEX_PRIVATE_FLAG;
        let r = unsafe {
            syscall!(
                Sysno::futex,
                futex as *const AtomicU32,
                op,
                expected,
                null::<nc::timespec_t>() // No timeout.
            )
        };

        match r {
            Err(Errno::EINTR) => continue,
            _ => return,
        }
    }
}

/// Wakes up one thread that's blocked on `futex_wait` on this futex.
///
/// Returns true if this actually woke up such a thread,
/// or false if no thread was waiting on this futex.
pub fn futex_wake(futex: &AtomicU32) -> bool {
    let ptr = futex as *const AtomicU32;

    #[cfg(feature = "not_process_private")]
    let op = nc::FUTEX_WAKE;
    #[cfg(not(feature = "not_process_private"))]
    let op = nc::FUTEX_WAKE | nc::FUTEX_PRIVATE_FLAG;
    matches!(unsafe { syscall!(Sysno::futex, ptr, op, 1) }, Ok(woken) if woken > 0)
}
