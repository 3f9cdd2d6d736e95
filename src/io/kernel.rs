use crate::io::{HandleBoundary, HandleError, OpenFlags};
use crate::sys::socket;
use core::fmt;

/// A file descriptor owned by a socket or connection.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Fd(i32);

impl Fd {
    /// The raw descriptor number, for reading and writing through it.
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

/// The Linux handle boundary: Unix-domain stream sockets named by filesystem
/// paths.
///
/// All descriptors are created close-on-exec.
#[derive(Copy, Clone, Debug, Default)]
pub struct Kernel;

impl HandleBoundary for Kernel {
    type Handle = Fd;

    fn open(&self, path: &str, flags: OpenFlags) -> Result<Fd, HandleError> {
        if !flags.contains(OpenFlags::SOCKET) {
            return Err(HandleError::NotASocket);
        }
        if !socket::is_valid_path(path) {
            return Err(HandleError::InvalidPath);
        }

        let fd = socket::listen(
            path,
            flags.contains(OpenFlags::NONBLOCK),
            flags.contains(OpenFlags::CREATE),
        )?;
        Ok(Fd(fd))
    }

    fn close(&self, handle: Fd) {
        if let Some(errno) = socket::close(handle.0) {
            log::warn!("closing {:?} failed: {:?}", handle, errno);
        }
    }

    fn connect(&self, path: &str) -> Result<Fd, HandleError> {
        if !socket::is_valid_path(path) {
            return Err(HandleError::InvalidPath);
        }
        Ok(Fd(socket::connect(path)?))
    }

    fn accept(&self, listener: &Fd) -> Result<Fd, HandleError> {
        Ok(Fd(socket::accept(listener.0)?))
    }
}
