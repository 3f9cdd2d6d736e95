use crate::io::socket::{Registry, SocketId};
use crate::io::{HandleBoundary, HandleError, Kernel};
use crate::sync::Mutex;
use alloc::sync::{Arc, Weak};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a [`Connection`]. Ids are never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> ConnectionId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ConnectionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection#{}", self.0)
    }
}

/// The handle of a connection. `None` once closed.
pub(crate) struct Endpoint<H> {
    handle: Mutex<Option<H>>,
}

impl<H> Endpoint<H> {
    /// Takes the handle out, leaving the endpoint closed.
    pub(crate) fn take(&self) -> Option<H> {
        self.handle.lock().take()
    }
}

/// One end of a bidirectional channel.
///
/// A connection is either the client side returned by [`connect`], or the
/// server side returned by [`Socket::accept`](super::Socket::accept), which
/// stays registered on its socket until it is closed. Closing a server side
/// connection unregisters it. If its socket was closed first, the connection
/// is already closed too and [`socket`](Connection::socket) returns `None`.
///
/// Dropping a connection closes it.
pub struct Connection<B: HandleBoundary = Kernel> {
    id: ConnectionId,
    boundary: B,
    endpoint: Arc<Endpoint<B::Handle>>,
    socket: Option<Weak<Registry<B::Handle>>>,
}

/// Connects to the Unix-domain socket listening at `path`.
///
/// # Errors
///
/// Fails with [`HandleError::NotFound`] or [`HandleError::Refused`] when
/// nothing accepts connections at `path`.
pub fn connect(path: &str) -> Result<Connection<Kernel>, HandleError> {
    connect_with(Kernel, path)
}

/// Connects to the listening endpoint at `path` through `boundary`.
///
/// The returned connection belongs to no socket.
pub fn connect_with<B: HandleBoundary>(boundary: B, path: &str) -> Result<Connection<B>, HandleError> {
    let handle = boundary.connect(path)?;
    let connection = Connection::new(boundary, handle, None);
    log::debug!("{} connected to {:?} as {:?}", connection.id, path, handle);
    Ok(connection)
}

impl<B: HandleBoundary> Connection<B> {
    pub(crate) fn new(boundary: B, handle: B::Handle, socket: Option<Weak<Registry<B::Handle>>>) -> Connection<B> {
        Connection {
            id: ConnectionId::next(),
            boundary,
            endpoint: Arc::new(Endpoint { handle: Mutex::named("connection.handle", Some(handle)) }),
            socket,
        }
    }

    pub(crate) fn endpoint(&self) -> Weak<Endpoint<B::Handle>> {
        Arc::downgrade(&self.endpoint)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The socket that accepted this connection, while that socket is open.
    pub fn socket(&self) -> Option<SocketId> {
        self.socket.as_ref()?.upgrade().map(|registry| registry.id())
    }

    /// Returns true if this connection was created by [`connect`].
    pub fn is_client(&self) -> bool {
        self.socket.is_none()
    }

    pub fn is_open(&self) -> bool {
        self.endpoint.handle.lock().is_some()
    }

    /// The handle to exchange data through, or `None` once closed.
    ///
    /// The handle stays owned by the connection and must not be used after
    /// the connection (or its socket) is closed.
    pub fn handle(&self) -> Option<B::Handle> {
        *self.endpoint.handle.lock()
    }

    /// Closes the handle and unregisters the connection from its socket.
    pub fn close(self) {
        drop(self);
    }
}

impl<B: HandleBoundary> Drop for Connection<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.endpoint.take() {
            self.boundary.close(handle);
            log::debug!("{} closed", self.id);
        }
        if let Some(registry) = self.socket.as_ref().and_then(Weak::upgrade) {
            registry.unregister(self.id);
        }
    }
}

impl<B: HandleBoundary> fmt::Debug for Connection<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("socket", &self.socket())
            .field("handle", &self.handle())
            .finish()
    }
}
