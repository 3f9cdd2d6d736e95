//! An in-memory handle boundary that records what happens to its handles.

extern crate std;
use std::collections::{HashMap, VecDeque};
use std::string::{String, ToString};
use std::sync::{Arc, Condvar, Mutex};
use std::vec::Vec;

use crate::io::{HandleBoundary, HandleError, OpenFlags};
use syscalls::Errno;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MockHandle(pub u32);

#[derive(Default)]
struct State {
    next: u32,
    listeners: HashMap<String, MockHandle>,
    pending: HashMap<MockHandle, VecDeque<MockHandle>>,
    /// Server side handle -> client side handle.
    peers: HashMap<MockHandle, MockHandle>,
    opened: Vec<OpenFlags>,
    closed: Vec<MockHandle>,
}

impl State {
    fn allocate(&mut self) -> MockHandle {
        self.next += 1;
        MockHandle(self.next)
    }
}

#[derive(Clone, Default)]
pub struct MockBoundary {
    inner: Arc<(Mutex<State>, Condvar)>,
}

impl MockBoundary {
    /// Every handle closed so far, in closing order.
    pub fn closed(&self) -> Vec<MockHandle> {
        self.inner.0.lock().unwrap().closed.clone()
    }

    /// Flags of every `open` call, in order.
    pub fn opened(&self) -> Vec<OpenFlags> {
        self.inner.0.lock().unwrap().opened.clone()
    }

    /// The client handle connected to the server side handle `server`.
    pub fn peer_of(&self, server: MockHandle) -> Option<MockHandle> {
        self.inner.0.lock().unwrap().peers.get(&server).copied()
    }
}

impl HandleBoundary for MockBoundary {
    type Handle = MockHandle;

    fn open(&self, path: &str, flags: OpenFlags) -> Result<MockHandle, HandleError> {
        let mut state = self.inner.0.lock().unwrap();
        state.opened.push(flags);
        if !flags.contains(OpenFlags::SOCKET) {
            return Err(HandleError::NotASocket);
        }
        if path.is_empty() {
            return Err(HandleError::InvalidPath);
        }
        if state.listeners.contains_key(path) && !flags.contains(OpenFlags::CREATE) {
            return Err(HandleError::Os(Errno::EADDRINUSE));
        }

        let listener = state.allocate();
        state.listeners.insert(path.to_string(), listener);
        state.pending.insert(listener, VecDeque::new());
        Ok(listener)
    }

    fn close(&self, handle: MockHandle) {
        let mut state = self.inner.0.lock().unwrap();
        assert!(!state.closed.contains(&handle), "{:?} closed twice", handle);
        state.closed.push(handle);
        state.listeners.retain(|_, listener| *listener != handle);
        state.pending.remove(&handle);
    }

    fn connect(&self, path: &str) -> Result<MockHandle, HandleError> {
        let mut state = self.inner.0.lock().unwrap();
        let listener = *state.listeners.get(path).ok_or(HandleError::NotFound)?;

        let client = state.allocate();
        let server = state.allocate();
        state.peers.insert(server, client);
        state.pending.get_mut(&listener).unwrap().push_back(server);
        self.inner.1.notify_all();
        Ok(client)
    }

    fn accept(&self, listener: &MockHandle) -> Result<MockHandle, HandleError> {
        let mut state = self.inner.0.lock().unwrap();
        loop {
            match state.pending.get_mut(listener) {
                None => return Err(HandleError::Os(Errno::EBADF)),
                Some(queue) => {
                    if let Some(server) = queue.pop_front() {
                        return Ok(server);
                    }
                }
            }
            state = self.inner.1.wait(state).unwrap();
        }
    }
}
