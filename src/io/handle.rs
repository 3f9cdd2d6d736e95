use bitflags::bitflags;
use core::fmt;
use syscalls::Errno;

bitflags! {
    /// Modes a handle is opened with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        /// Replace a socket left at the path by an earlier listener.
        /// Any other kind of entry makes the open fail.
        const CREATE = 1 << 2;
        /// Operations on the handle fail with [`HandleError::WouldBlock`]
        /// instead of blocking.
        const NONBLOCK = 1 << 3;
        /// Open the path as a listening endpoint.
        /// [`Socket`](super::Socket) always adds this bit.
        const SOCKET = 1 << 4;
    }
}

/// Reasons the handle boundary could not establish or obtain an endpoint.
///
/// These are environmental conditions, callers may retry or report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// The path cannot name an endpoint (empty, too long or containing NUL).
    #[error("path cannot name an endpoint")]
    InvalidPath,
    /// The handle was opened without [`OpenFlags::SOCKET`].
    #[error("endpoint was not opened as a socket")]
    NotASocket,
    /// Nothing is listening at the path.
    #[error("no endpoint at this path")]
    NotFound,
    /// The endpoint exists but refused the connection.
    #[error("connection refused")]
    Refused,
    /// The handle is non-blocking and the operation would have blocked.
    #[error("operation would block")]
    WouldBlock,
    /// Any other failure reported by the kernel.
    #[error("system call failed: {0:?}")]
    Os(Errno),
}

impl From<Errno> for HandleError {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::ENOENT => HandleError::NotFound,
            Errno::ECONNREFUSED => HandleError::Refused,
            Errno::EAGAIN => HandleError::WouldBlock,
            Errno::ENOTSOCK => HandleError::NotASocket,
            errno => HandleError::Os(errno),
        }
    }
}

/// The kernel operations sockets and connections are built on.
///
/// A handle returned by `open`, `connect` or `accept` is owned by exactly one
/// [`Socket`](super::Socket) or [`Connection`](super::Connection), which is
/// the only one to ever `close` it.
pub trait HandleBoundary: Clone + Send + Sync {
    /// A live endpoint. Copying it does not duplicate the endpoint.
    type Handle: Copy + fmt::Debug + Send + Sync;

    /// Opens `path` as a listening endpoint.
    fn open(&self, path: &str, flags: OpenFlags) -> Result<Self::Handle, HandleError>;

    /// Releases the endpoint. The handle must not be used afterwards.
    fn close(&self, handle: Self::Handle);

    /// Connects to the listening endpoint at `path`.
    fn connect(&self, path: &str) -> Result<Self::Handle, HandleError>;

    /// Blocks until a peer connects to `listener`, returning the server side
    /// of the new channel.
    fn accept(&self, listener: &Self::Handle) -> Result<Self::Handle, HandleError>;
}
