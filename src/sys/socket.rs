//! Unix-domain stream sockets, straight on top of the socket syscalls.

use core::mem::size_of;
use syscalls::{syscall, Errno, Sysno};

/// Length of `sockaddr_un::sun_path` on Linux.
pub const SUN_PATH_LEN: usize = 108;

/// Pending connections the kernel queues for a listening socket.
const BACKLOG: usize = 128;

#[repr(C)]
struct SockaddrUn {
    sun_family: u16,
    sun_path: [u8; SUN_PATH_LEN],
}

impl SockaddrUn {
    /// Builds the address for `path`, or `None` if it cannot be represented.
    fn new(path: &str) -> Option<(SockaddrUn, usize)> {
        let bytes = path.as_bytes();
        // One byte is kept for the terminating NUL.
        if bytes.is_empty() || bytes.len() >= SUN_PATH_LEN || bytes.contains(&0) {
            return None;
        }

        let mut addr = SockaddrUn { sun_family: nc::AF_UNIX as u16, sun_path: [0; SUN_PATH_LEN] };
        addr.sun_path[..bytes.len()].copy_from_slice(bytes);
        Some((addr, size_of::<u16>() + bytes.len() + 1))
    }
}

/// Returns true if `path` fits in a Unix socket address.
pub fn is_valid_path(path: &str) -> bool {
    SockaddrUn::new(path).is_some()
}

fn stream_socket(nonblock: bool) -> Result<i32, Errno> {
    let mut ty = nc::SOCK_STREAM | nc::SOCK_CLOEXEC;
    if nonblock {
        ty |= nc::SOCK_NONBLOCK;
    }
    unsafe { syscall!(Sysno::socket, nc::AF_UNIX, ty, 0) }.map(|fd| fd as i32)
}

/// Creates a socket bound to `path` and listening on it.
///
/// With `replace`, a stale entry at `path` is unlinked first.
pub fn listen(path: &str, nonblock: bool, replace: bool) -> Result<i32, Errno> {
    let (addr, len) = SockaddrUn::new(path).ok_or(Errno::EINVAL)?;

    if replace {
        unlink_stale_socket(&addr)?;
    }

    let fd = stream_socket(nonblock)?;
    let bound = unsafe { syscall!(Sysno::bind, fd, &addr as *const SockaddrUn, len) }
        .and_then(|_| unsafe { syscall!(Sysno::listen, fd, BACKLOG) });

    match bound {
        Ok(_) => Ok(fd),
        Err(errno) => {
            close(fd);
            Err(errno)
        }
    }
}

/// Unlinks the socket file left at `addr` by an earlier listener.
///
/// Anything other than a socket is left alone and reported as `EADDRINUSE`.
fn unlink_stale_socket(addr: &SockaddrUn) -> Result<(), Errno> {
    use core::mem::MaybeUninit;

    let path = addr.sun_path.as_ptr();
    let mut st: MaybeUninit<nc::stat_t> = MaybeUninit::uninit();
    match unsafe { syscall!(Sysno::newfstatat, nc::AT_FDCWD, path, st.as_mut_ptr(), nc::AT_SYMLINK_NOFOLLOW) } {
        Ok(_) => {}
        Err(Errno::ENOENT) => return Ok(()),
        Err(errno) => return Err(errno),
    }
    let st = unsafe { st.assume_init() };
    if (st.st_mode as u32) & (nc::S_IFMT as u32) != nc::S_IFSOCK as u32 {
        return Err(Errno::EADDRINUSE);
    }

    match unsafe { syscall!(Sysno::unlinkat, nc::AT_FDCWD, path, 0) } {
        Ok(_) | Err(Errno::ENOENT) => Ok(()),
        Err(errno) => Err(errno),
    }
}

/// Creates a socket connected to the listener at `path`.
pub fn connect(path: &str) -> Result<i32, Errno> {
    let (addr, len) = SockaddrUn::new(path).ok_or(Errno::EINVAL)?;
    let fd = stream_socket(false)?;

    loop {
        match unsafe { syscall!(Sysno::connect, fd, &addr as *const SockaddrUn, len) } {
            Ok(_) => return Ok(fd),
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                close(fd);
                return Err(errno);
            }
        }
    }
}

/// Blocks until a peer connects to the listening socket `fd`.
pub fn accept(fd: i32) -> Result<i32, Errno> {
    use core::ptr::null_mut;

    loop {
        let r = unsafe {
            syscall!(Sysno::accept4, fd, null_mut::<u8>(), null_mut::<u32>(), nc::SOCK_CLOEXEC)
        };
        match r {
            Ok(peer) => return Ok(peer as i32),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno),
        }
    }
}

/// Closes `fd`. The descriptor is released even when the kernel reports an error.
pub fn close(fd: i32) -> Option<Errno> {
    unsafe { syscall!(Sysno::close, fd) }.err()
}
