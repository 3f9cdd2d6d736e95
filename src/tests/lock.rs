extern crate std;
use std::string::String;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::sync::{Holder, Lock};

/// Far above any pid_max, so never the id of a real thread.
const FOREIGN: u32 = 0x7fff_fff0;

fn panic_message(payload: std::boxed::Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => String::from(*payload.downcast::<&'static str>().unwrap()),
    }
}

#[test]
fn smoke() {
    let lock = Lock::new("smoke");
    assert!(!lock.is_acquired());
    assert_eq!(lock.holder(), None);

    lock.acquire();
    assert!(lock.is_acquired());
    assert_eq!(lock.holder(), Some(Holder::current()));
    lock.assert_held();
    lock.release();

    assert!(!lock.is_acquired());
    assert_eq!(lock.holder(), None);
    assert_eq!(lock.name(), "smoke");
}

#[test]
fn holder_rejects_reserved_values() {
    assert!(Holder::new(0).is_none());
    assert!(Holder::new(1 << 31).is_none());
    assert!(Holder::new(u32::MAX).is_none());
    assert_eq!(Holder::new(FOREIGN).map(Holder::get), Some(FOREIGN));
}

#[test]
fn holder_differs_between_threads() {
    let here = Holder::current();
    let there = thread::spawn(Holder::current).join().unwrap();
    assert_ne!(here, there);
    assert_eq!(here, Holder::current());
}

#[test]
fn mutual_exclusion() {
    const J: usize = 1000;
    const K: usize = 6;

    static LOCK: Lock = Lock::new("exclusion");
    static INSIDE: AtomicUsize = AtomicUsize::new(0);
    static TOTAL: AtomicUsize = AtomicUsize::new(0);

    let threads: std::vec::Vec<_> = (0..K)
        .map(|_| {
            thread::spawn(|| {
                for _ in 0..J {
                    LOCK.acquire();
                    assert_eq!(INSIDE.fetch_add(1, Ordering::SeqCst), 0);
                    assert_eq!(LOCK.holder(), Some(Holder::current()));
                    TOTAL.fetch_add(1, Ordering::SeqCst);
                    INSIDE.fetch_sub(1, Ordering::SeqCst);
                    LOCK.release();
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }
    assert_eq!(TOTAL.load(Ordering::SeqCst), J * K);
    assert!(!LOCK.is_acquired());
}

#[test]
fn acquire_blocks_until_release() {
    let lock = Arc::new(Lock::new("blocking"));
    let acquired = Arc::new(AtomicBool::new(false));

    lock.acquire();
    let waiter = {
        let (lock, acquired) = (lock.clone(), acquired.clone());
        thread::spawn(move || {
            lock.acquire();
            acquired.store(true, Ordering::SeqCst);
            lock.release();
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!acquired.load(Ordering::SeqCst));
    lock.release();

    waiter.join().unwrap();
    assert!(acquired.load(Ordering::SeqCst));
}

#[test]
fn try_acquire() {
    let lock = Arc::new(Lock::new("try"));
    assert!(lock.try_acquire());
    let me = Holder::current();

    let lock2 = lock.clone();
    let (tx, rx) = channel();
    thread::spawn(move || {
        // Fails right away and leaves the holder alone.
        tx.send(lock2.try_acquire()).unwrap();
        tx.send(lock2.try_acquire_by(Holder::new(FOREIGN).unwrap())).unwrap();
    });
    assert!(!rx.recv().unwrap());
    assert!(!rx.recv().unwrap());

    assert_eq!(lock.holder(), Some(me));
    lock.release();
    assert!(lock.try_acquire());
    lock.release();
}

#[test]
fn ownership_transfer() {
    static LOCK: Lock = Lock::new("transfer");
    let worker = Holder::new(FOREIGN).unwrap();

    LOCK.acquire_by(worker);
    assert_eq!(LOCK.holder(), Some(worker));

    thread::spawn(move || LOCK.release_by(worker)).join().unwrap();
    assert!(!LOCK.is_acquired());
}

#[test]
fn release_by_other_thread_is_fatal() {
    let lock = Arc::new(Lock::new("victim"));
    lock.acquire();

    let lock2 = lock.clone();
    let err = thread::spawn(move || lock2.release()).join().unwrap_err();
    let message = panic_message(err);
    assert!(message.starts_with("lock `victim` held by"), "{}", message);
    assert!(message.contains("lock.rs"), "{}", message);

    // The violation left the lock untouched.
    assert_eq!(lock.holder(), Some(Holder::current()));
    lock.release();
}

#[test]
#[should_panic(expected = "lock `transfer` held by 2147483632")]
fn self_release_after_acquire_by_is_fatal() {
    let lock = Lock::new("transfer");
    lock.acquire_by(Holder::new(FOREIGN).unwrap());
    lock.release();
}

#[test]
#[should_panic(expected = "lock `twice`")]
fn double_release_is_fatal() {
    let lock = Lock::new("twice");
    lock.acquire();
    lock.release();
    lock.release();
}

#[test]
#[should_panic(expected = "while not held")]
fn release_by_on_free_lock_is_fatal() {
    let lock = Lock::new("free");
    lock.release_by(Holder::new(FOREIGN).unwrap());
}

#[test]
#[should_panic(expected = "lock `idle` not held but asserted")]
fn assert_on_free_lock_is_fatal() {
    let lock = Lock::new("idle");
    lock.assert_held();
}

#[test]
fn assert_by_other_thread_is_fatal() {
    let lock = Arc::new(Lock::new("owned"));
    lock.acquire();

    let lock2 = lock.clone();
    let err = thread::spawn(move || lock2.assert_held()).join().unwrap_err();
    assert!(panic_message(err).starts_with("lock `owned` held by"));

    lock.assert_held();
    lock.release();
}

#[test]
fn release_by_wrong_holder_is_fatal() {
    let lock = Arc::new(Lock::new("handoff"));
    let owner = Holder::new(FOREIGN).unwrap();
    let other = Holder::new(FOREIGN - 1).unwrap();
    lock.acquire_by(owner);

    let lock2 = lock.clone();
    let err = thread::spawn(move || lock2.release_by(other)).join().unwrap_err();
    let message = panic_message(err);
    assert!(message.starts_with("lock `handoff` held by 2147483632 but released by 2147483631"), "{}", message);

    assert_eq!(lock.holder(), Some(owner));
    lock.release_by(owner);
}

#[test]
fn stale_release_by_does_not_free_new_holder() {
    let lock = Lock::new("stale");
    let first = Holder::new(FOREIGN).unwrap();
    lock.acquire_by(first);
    lock.release_by(first);

    lock.acquire();
    let err = thread::scope(|s| s.spawn(|| lock.release_by(first)).join()).unwrap_err();
    assert!(panic_message(err).contains("but released by 2147483632"));

    assert_eq!(lock.holder(), Some(Holder::current()));
    lock.release();
}

#[test]
fn racing_release_by_panics_exactly_once() {
    const ROUNDS: usize = 200;

    let lock = Arc::new(Lock::new("race"));
    let holder = Holder::new(FOREIGN).unwrap();

    for _ in 0..ROUNDS {
        lock.acquire_by(holder);
        let barrier = Arc::new(Barrier::new(2));
        let releasers: std::vec::Vec<_> = (0..2)
            .map(|_| {
                let (lock, barrier) = (lock.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    lock.release_by(holder);
                })
            })
            .collect();

        let failed = releasers.into_iter().filter_map(|t| t.join().err()).count();
        assert_eq!(failed, 1);
        assert!(!lock.is_acquired());
    }
}
