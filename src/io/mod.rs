//! Named, connection-oriented endpoints.
//!
//! A server opens a [`Socket`] on a path and [`accept`](Socket::accept)s
//! [`Connection`]s on it. Clients [`connect`] to the same path. The socket
//! keeps track of the connections it accepted and closes whatever is left
//! of them when it closes itself.
//!
//! Everything here sits on a [`HandleBoundary`], the kernel operations that
//! open, close, connect and accept endpoints. [`Kernel`] implements it with
//! Unix-domain sockets and is the default.

mod connection;
mod handle;
mod kernel;
mod socket;

pub use connection::connect;
pub use connection::connect_with;
pub use connection::Connection;
pub use connection::ConnectionId;
pub use handle::HandleBoundary;
pub use handle::HandleError;
pub use handle::OpenFlags;
pub use kernel::Fd;
pub use kernel::Kernel;
pub use socket::Socket;
pub use socket::SocketId;
