use crate::io::connection::{ConnectionId, Endpoint};
use crate::io::{Connection, HandleBoundary, HandleError, Kernel, OpenFlags};
use crate::sync::Mutex;
use alloc::collections::VecDeque;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a [`Socket`]. Ids are never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketId(u64);

impl SocketId {
    fn next() -> SocketId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SocketId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// A connection registered on a socket. Membership only, the connection
/// itself belongs to whoever accepted it.
struct Member<H> {
    id: ConnectionId,
    endpoint: Weak<Endpoint<H>>,
}

/// The part of a socket its connections point back to.
pub(crate) struct Registry<H> {
    id: SocketId,
    connections: Mutex<VecDeque<Member<H>>>,
}

impl<H> Registry<H> {
    fn new(id: SocketId) -> Registry<H> {
        Registry { id, connections: Mutex::named("socket.connections", VecDeque::new()) }
    }

    pub(crate) fn id(&self) -> SocketId {
        self.id
    }

    pub(crate) fn unregister(&self, id: ConnectionId) {
        self.connections.lock().retain(|member| member.id != id);
    }
}

/// A named, listening endpoint that tracks the connections accepted on it.
///
/// Connections come out of [`accept`](Socket::accept) in arrival order and
/// stay registered until they are closed, either one by one or all together
/// when the socket closes. Closing the socket closes every connection still
/// registered before releasing the listening handle.
///
/// Dropping a socket closes it.
///
/// # Examples
///
/// ```no_run
/// use ipc_linux_no_libc::io::{Socket, OpenFlags};
///
/// let socket = Socket::open("/run/compositor.sock", OpenFlags::CREATE)?;
/// loop {
///     let client = socket.accept()?;
///     // Talk to the client through `client.handle()`.
///     # break;
/// }
/// socket.close();
/// # Ok::<(), ipc_linux_no_libc::io::HandleError>(())
/// ```
pub struct Socket<B: HandleBoundary = Kernel> {
    boundary: B,
    listener: B::Handle,
    registry: Arc<Registry<B::Handle>>,
}

impl Socket<Kernel> {
    /// Opens a Unix-domain socket listening on `path`.
    ///
    /// # Errors
    ///
    /// Fails if the kernel cannot bind or listen on `path`.
    pub fn open(path: &str, flags: OpenFlags) -> Result<Socket<Kernel>, HandleError> {
        Socket::open_with(Kernel, path, flags)
    }
}

impl<B: HandleBoundary> Socket<B> {
    /// Opens `path` as a listening endpoint through `boundary`.
    ///
    /// [`OpenFlags::SOCKET`] is always added to `flags`.
    pub fn open_with(boundary: B, path: &str, flags: OpenFlags) -> Result<Socket<B>, HandleError> {
        let listener = boundary.open(path, flags | OpenFlags::SOCKET)?;
        let registry = Arc::new(Registry::new(SocketId::next()));
        log::debug!("{} listening on {:?} as {:?}", registry.id, path, listener);

        Ok(Socket { boundary, listener, registry })
    }

    pub fn id(&self) -> SocketId {
        self.registry.id
    }

    /// The listening handle.
    pub fn handle(&self) -> B::Handle {
        self.listener
    }

    /// Blocks until a peer connects, then registers and returns the server
    /// side of the new connection.
    ///
    /// # Errors
    ///
    /// Fails if the boundary could not produce a peer handle. Nothing is
    /// registered in that case.
    pub fn accept(&self) -> Result<Connection<B>, HandleError> {
        let peer = self.boundary.accept(&self.listener)?;
        let connection = Connection::new(self.boundary.clone(), peer, Some(Arc::downgrade(&self.registry)));

        self.registry.connections.lock().push_back(Member {
            id: connection.id(),
            endpoint: connection.endpoint(),
        });
        log::trace!("{} accepted {} on {:?}", self.registry.id, connection.id(), peer);

        Ok(connection)
    }

    /// Ids of the registered connections, in the order they were accepted.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.registry.connections.lock().iter().map(|member| member.id).collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.registry.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every registered connection, then the listening handle.
    pub fn close(self) {
        drop(self);
    }

    fn drain(&self) -> usize {
        let mut closed = 0;
        loop {
            // The guard is a temporary, so it is released before closing.
            let Some(member) = self.registry.connections.lock().pop_front() else {
                return closed;
            };
            // A connection dropped concurrently closes its own handle.
            if let Some(handle) = member.endpoint.upgrade().and_then(|endpoint| endpoint.take()) {
                self.boundary.close(handle);
                closed += 1;
            }
        }
    }
}

impl<B: HandleBoundary> Drop for Socket<B> {
    fn drop(&mut self) {
        let closed = self.drain();
        self.boundary.close(self.listener);
        log::debug!("{} closed after closing {} connection(s)", self.registry.id, closed);
    }
}

impl<B: HandleBoundary> fmt::Debug for Socket<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.registry.id)
            .field("listener", &self.listener)
            .field("connections", &self.connections())
            .finish()
    }
}
