use crate::sys::futex::{futex_wait, futex_wake};
use crate::sys::thread::current_thread_id;
use core::fmt;
use core::num::NonZeroU32;
use core::panic::Location;
use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering::{Acquire, Relaxed, Release};

/// Futex word value of a lock nobody holds.
const UNLOCKED: u32 = 0;
/// Set in the futex word while threads may be sleeping on it.
const WAITERS: u32 = 1 << 31;

/// The identity a [`Lock`] is held under.
///
/// A holder is usually the kernel id of the thread that acquired the lock
/// ([`Holder::current`]), but any non-zero 31-bit value can be used when a
/// lock is acquired on behalf of someone else with [`Lock::acquire_by`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Holder(NonZeroU32);

impl Holder {
    /// Creates a holder from a raw identity.
    ///
    /// Returns `None` for zero or for values with the top bit set, which the
    /// lock reserves for its own bookkeeping.
    pub const fn new(id: u32) -> Option<Holder> {
        if id & WAITERS != 0 {
            return None;
        }
        match NonZeroU32::new(id) {
            Some(id) => Some(Holder(id)),
            None => None,
        }
    }

    /// The holder identity of the calling thread.
    pub fn current() -> Holder {
        match Holder::new(current_thread_id()) {
            Some(holder) => holder,
            None => unreachable!("kernel thread ids are positive and below 2^31"),
        }
    }

    /// Returns the raw identity.
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Holder").field(&self.get()).finish()
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt(f)
    }
}

/// A holder-tracked mutual exclusion primitive.
///
/// Unlike [`Mutex`](super::Mutex), a `Lock` guards no data of its own and
/// remembers *who* holds it. Only that holder may release it. Holding can be
/// established by the acquiring thread itself ([`acquire`]) or assigned to an
/// explicit [`Holder`] ([`acquire_by`]), which lets one thread take a lock
/// that another thread will release later ([`release_by`]).
///
/// Every broken contract (releasing a lock you do not hold, releasing an
/// unlocked lock, a failing [`assert_held`]) panics with the lock's name and
/// the caller's location. Such a failure is a logic error, never a condition
/// to recover from. Build with `panic = "abort"` to have it end the process.
///
/// Locks are not reentrant: acquiring a lock the calling thread already holds
/// deadlocks.
///
/// [`acquire`]: Lock::acquire
/// [`acquire_by`]: Lock::acquire_by
/// [`release_by`]: Lock::release_by
/// [`assert_held`]: Lock::assert_held
///
/// # Examples
///
/// ```
/// use ipc_linux_no_libc::sync::{Holder, Lock};
/// use std::thread;
///
/// static LOCK: Lock = Lock::new("table");
///
/// // Take the lock here, hand it to a worker that releases it.
/// let worker = Holder::new(7).unwrap();
/// LOCK.acquire_by(worker);
/// thread::spawn(move || LOCK.release_by(worker)).join().unwrap();
///
/// assert!(!LOCK.is_acquired());
/// ```
pub struct Lock {
    state: AtomicU32,
    name: &'static str,
}

impl Lock {
    /// Creates a new, unlocked lock labelled `name` in diagnostics.
    #[inline]
    pub const fn new(name: &'static str) -> Lock {
        Lock { state: AtomicU32::new(UNLOCKED), name }
    }

    /// The diagnostic label of this lock.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if somebody holds the lock right now.
    pub fn is_acquired(&self) -> bool {
        self.state.load(Relaxed) != UNLOCKED
    }

    /// Returns the current holder, or `None` if the lock is free.
    pub fn holder(&self) -> Option<Holder> {
        Holder::new(self.state.load(Relaxed) & !WAITERS)
    }

    /// Acquires the lock for the calling thread, blocking until it is free.
    pub fn acquire(&self) {
        self.acquire_by(Holder::current());
    }

    /// Acquires the lock on behalf of `holder`, blocking until it is free.
    ///
    /// The lock must later be released with [`release_by`](Lock::release_by)
    /// naming the same holder.
    pub fn acquire_by(&self, holder: Holder) {
        if self.state.compare_exchange(UNLOCKED, holder.get(), Acquire, Relaxed).is_err() {
            self.acquire_contended(holder);
        }
        log::trace!("lock `{}` acquired by {}", self.name, holder);
    }

    /// Attempts to acquire the lock for the calling thread without blocking.
    ///
    /// Returns false, leaving the current holder untouched, if the lock is
    /// already held.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_by(Holder::current())
    }

    /// Attempts to acquire the lock on behalf of `holder` without blocking.
    pub fn try_acquire_by(&self, holder: Holder) -> bool {
        self.state.compare_exchange(UNLOCKED, holder.get(), Acquire, Relaxed).is_ok()
    }

    /// Releases the lock held by the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held, or held by someone else.
    #[track_caller]
    pub fn release(&self) {
        self.release_at(Holder::current(), Location::caller());
    }

    /// Releases the lock held by `holder`, from whichever thread calls it.
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held, or held by someone other than `holder`.
    #[track_caller]
    pub fn release_by(&self, holder: Holder) {
        self.release_at(holder, Location::caller());
    }

    /// Checks that the calling thread holds the lock.
    ///
    /// # Panics
    ///
    /// Panics if it does not.
    #[track_caller]
    pub fn assert_held(&self) {
        let holder = Holder::current();
        match self.holder() {
            Some(h) if h == holder => {}
            Some(h) => self.violation(format_args!("held by {} but asserted by {}", h, holder), Location::caller()),
            None => self.violation(format_args!("not held but asserted by {}", holder), Location::caller()),
        }
    }

    pub(crate) fn release_at(&self, holder: Holder, location: &'static Location<'static>) {
        let mut state = self.state.load(Relaxed);
        loop {
            match Holder::new(state & !WAITERS) {
                Some(h) if h == holder => {}
                Some(h) => self.violation(format_args!("held by {} but released by {}", h, holder), location),
                None => self.violation(format_args!("released by {} while not held", holder), location),
            }

            // Check and clear in one step, so a racing release sees the change.
            match self.state.compare_exchange(state, UNLOCKED, Release, Relaxed) {
                Ok(_) => break,
                Err(s) => state = s,
            }
        }

        if state & WAITERS != 0 {
            futex_wake(&self.state);
        }
        log::trace!("lock `{}` released by {}", self.name, holder);
    }

    #[cold]
    fn acquire_contended(&self, holder: Holder) {
        let mut state = self.spin();

        loop {
            if state == UNLOCKED {
                // Other threads may still be asleep, so keep the waiters bit.
                match self.state.compare_exchange(UNLOCKED, holder.get() | WAITERS, Acquire, Relaxed) {
                    Ok(_) => return,
                    Err(s) => {
                        state = s;
                        continue;
                    }
                }
            }

            if state & WAITERS == 0 {
                match self.state.compare_exchange(state, state | WAITERS, Relaxed, Relaxed) {
                    Ok(_) => state |= WAITERS,
                    Err(s) => {
                        state = s;
                        continue;
                    }
                }
            }

            futex_wait(&self.state, state);
            state = self.spin();
        }
    }

    fn spin(&self) -> u32 {
        let mut spin = 100;
        loop {
            // Stop spinning once the lock is free or somebody already sleeps on it.
            let state = self.state.load(Relaxed);
            if state == UNLOCKED || state & WAITERS != 0 || spin == 0 {
                return state;
            }
            core::hint::spin_loop();
            spin -= 1;
        }
    }

    #[cold]
    #[inline(never)]
    fn violation(&self, what: fmt::Arguments<'_>, location: &Location<'_>) -> ! {
        log::error!("lock `{}` {} at {}", self.name, what, location);
        panic!("lock `{}` {} at {}", self.name, what, location);
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("name", &self.name)
            .field("holder", &self.holder())
            .finish()
    }
}
