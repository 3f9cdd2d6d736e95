//! Holder-tracked synchronization primitives.
//!
//! - [`Lock`]: Mutual exclusion that records which [`Holder`] owns it.
//!   A lock can be acquired on behalf of one holder and released by another
//!   thread naming that holder, and every misuse (releasing a lock you do
//!   not hold, releasing twice) panics with the lock's name and the call
//!   site.
//!
//! - [`Mutex`]: Data-protecting mutual exclusion on top of a [`Lock`],
//!   handing out RAII guards. It does not have a poison mechanism.
//!
//! [`Lock`]: Lock
//! [`Holder`]: Holder
//! [`Mutex`]: Mutex

mod lock;
mod mutex;

pub use lock::Holder;
pub use lock::Lock;
pub use mutex::Mutex;
pub use mutex::MutexGuard;
pub use mutex::TryLockError;
pub use mutex::TryLockResult;
