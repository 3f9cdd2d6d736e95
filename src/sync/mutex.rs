use crate::sync::{Holder, Lock};
use core::cell::UnsafeCell;
use core::error::Error;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::panic::Location;

/// An enumeration of possible errors associated with a [`TryLockResult`] which
/// can occur while trying to acquire a lock, from the [`try_lock`] method on a
/// [`Mutex`].
///
/// [`try_lock`]: Mutex::try_lock
/// [`Mutex`]: Mutex
pub enum TryLockError {
    /// The lock could not be acquired at this time because the operation would
    /// otherwise block.
    WouldBlock,
}

impl fmt::Debug for TryLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TryLockError::WouldBlock => "WouldBlock".fmt(f),
        }
    }
}

impl fmt::Display for TryLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TryLockError::WouldBlock => "try_lock failed because the operation would block",
        }.fmt(f)
    }
}

impl Error for TryLockError {}

/// A type alias for the result of a nonblocking locking method.
pub type TryLockResult<Guard> = Result<Guard, TryLockError>;

/// A mutual exclusion primitive protecting shared data, built on a [`Lock`].
///
/// The data can only be accessed through the RAII guards returned from
/// [`lock`] and [`try_lock`]. The underlying lock is held by the thread that
/// created the guard, and the guard releases it when dropped. The lock's
/// ownership rules therefore apply: the guard cannot leave its thread, and
/// locking a mutex the thread already holds deadlocks.
///
/// There is no poisoning, a panic while holding the guard still releases the
/// lock.
///
/// [`lock`]: Self::lock
/// [`try_lock`]: Self::try_lock
///
/// # Examples
///
/// ```
/// use ipc_linux_no_libc::sync::Mutex;
/// use std::sync::Arc;
/// use std::thread;
///
/// let data = Arc::new(Mutex::named("counter", 0));
///
/// let handles: Vec<_> = (0..4).map(|_| {
///     let data = Arc::clone(&data);
///     thread::spawn(move || *data.lock() += 1)
/// }).collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(*data.lock(), 4);
/// ```
pub struct Mutex<T: ?Sized> {
    inner: Lock,
    data: UnsafeCell<T>,
}

/// `T` must be `Send` for a [`Mutex`] to be `Send` because it is possible to acquire
/// the owned `T` from the `Mutex` via [`into_inner`].
///
/// [`into_inner`]: Mutex::into_inner
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}

/// `T` must be `Send` for [`Mutex`] to be `Sync`, since the mutex hands out
/// `&mut T` to one thread at a time.
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

/// An RAII implementation of a "scoped lock" of a mutex. When this structure is
/// dropped (falls out of scope), the lock will be released.
///
/// This structure is created by the [`lock`] and [`try_lock`] methods on
/// [`Mutex`].
///
/// [`lock`]: Mutex::lock
/// [`try_lock`]: Mutex::try_lock
#[must_use = "if unused the Mutex will immediately unlock"]
#[must_not_suspend = "holding a MutexGuard across suspend \
                      points can cause deadlocks, delays, \
                      and cause Futures to not implement `Send`"]
#[clippy::has_significant_drop]
pub struct MutexGuard<'a, T: ?Sized + 'a> {
    lock: &'a Mutex<T>,
    holder: Holder,
    location: &'static Location<'static>,
}

/// The lock is held by the thread that created the guard, so the guard must be
/// dropped on that same thread.
impl<T: ?Sized> !Send for MutexGuard<'_, T> {}

/// `T` must be `Sync` for a [`MutexGuard<T>`] to be `Sync`
/// because it is possible to get a `&T` from `&MutexGuard` (via `Deref`).
unsafe impl<T: ?Sized + Sync> Sync for MutexGuard<'_, T> {}

impl<T> Mutex<T> {
    /// Creates a new mutex in an unlocked state ready for use.
    #[inline]
    pub const fn new(t: T) -> Mutex<T> {
        Mutex::named("mutex", t)
    }

    /// Creates a new unlocked mutex whose lock is labelled `name` in diagnostics.
    #[inline]
    pub const fn named(name: &'static str, t: T) -> Mutex<T> {
        Mutex { inner: Lock::new(name), data: UnsafeCell::new(t) }
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Acquires the mutex, blocking the current thread until it is able to do so.
    ///
    /// Calling this on a thread that already holds the mutex deadlocks.
    #[track_caller]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let holder = Holder::current();
        self.inner.acquire_by(holder);
        MutexGuard::new(self, holder, Location::caller())
    }

    /// Attempts to acquire the mutex without blocking.
    ///
    /// # Errors
    ///
    /// If the mutex could not be acquired because it is already locked, then
    /// this call will return the [`WouldBlock`] error.
    ///
    /// [`WouldBlock`]: TryLockError::WouldBlock
    #[track_caller]
    pub fn try_lock(&self) -> TryLockResult<MutexGuard<'_, T>> {
        let holder = Holder::current();
        if self.inner.try_acquire_by(holder) {
            Ok(MutexGuard::new(self, holder, Location::caller()))
        } else {
            Err(TryLockError::WouldBlock)
        }
    }

    /// The diagnostic label of the underlying lock.
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Consumes this mutex, returning the underlying data.
    pub fn into_inner(self) -> T
    where
        T: Sized,
    {
        self.data.into_inner()
    }

    /// Returns a mutable reference to the underlying data.
    ///
    /// Since this call borrows the `Mutex` mutably, no actual locking needs to
    /// take place.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: ?Sized + Default> Default for Mutex<T> {
    /// Creates a `Mutex<T>`, with the `Default` value for T.
    fn default() -> Mutex<T> {
        Mutex::new(Default::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Mutex");
        d.field("name", &self.inner.name());
        match self.try_lock() {
            Ok(guard) => {
                d.field("data", &&*guard);
            }
            Err(TryLockError::WouldBlock) => {
                d.field("data", &format_args!("<locked>"));
            }
        }
        d.finish_non_exhaustive()
    }
}

impl<'mutex, T: ?Sized> MutexGuard<'mutex, T> {
    fn new(lock: &'mutex Mutex<T>, holder: Holder, location: &'static Location<'static>) -> MutexGuard<'mutex, T> {
        MutexGuard { lock, holder, location }
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.inner.release_at(self.holder, self.location);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}
