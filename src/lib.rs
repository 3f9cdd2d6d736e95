/*!
This project provides the communication and synchronization substrate of
Linux userspace programs, all without the use of libc. Instead, it makes
Linux syscalls directly.

It consists of two parts:

* [`sync`] - a holder-tracked [`Lock`](sync::Lock) whose ownership can be
  handed from one thread to another, and a [`Mutex`](sync::Mutex) built on it.
  Misusing a lock (releasing it from a thread that does not hold it,
  releasing it twice) is a fatal error, not a recoverable one.
* [`io`] - named, connection-oriented endpoints: a listening
  [`Socket`](io::Socket) that tracks every [`Connection`](io::Connection) it
  accepted, and client connections created with [`connect`](io::connect).

# Crate features

* **not_process_private** -
  Allows for sharing locks with other processes.
*/

#![cfg(target_os = "linux")]
#![no_std]

#![feature(must_not_suspend)]
#![feature(negative_impls)]

extern crate alloc;

pub mod io;
pub mod sync;
mod sys;
mod tests;
