use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::{InboundStream, OutboundStream};

/// Take ownership of a descriptor inherited from the parent process.
///
/// The descriptor is checked with `fcntl(F_GETFD)` and marked close-on-exec
/// so it does not leak into processes this child spawns.
///
/// # Safety
///
/// `fd` must not be owned by anything else in this process. Inherited
/// channel descriptors satisfy this when claimed once at startup.
pub unsafe fn claim_inherited_fd(fd: RawFd) -> Result<OwnedFd> {
    // SAFETY: F_GETFD only inspects the descriptor table entry.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(TransportError::InvalidDescriptor {
            fd,
            source: std::io::Error::last_os_error(),
        });
    }

    // SAFETY: `fd` is open (checked above) and the caller guarantees it is
    // not owned elsewhere.
    let owned = unsafe { OwnedFd::from_raw_fd(fd) };
    set_cloexec(&owned)?;
    debug!(fd, "claimed inherited descriptor");
    Ok(owned)
}

/// Wrap a descriptor as the inbound (request) stream.
///
/// Fails with [`TransportError::WrongAccessMode`] if the descriptor was
/// opened write-only.
pub fn open_read_stream(fd: OwnedFd) -> Result<InboundStream> {
    let mode = access_mode(&fd)?;
    if mode == libc::O_WRONLY {
        return Err(TransportError::WrongAccessMode {
            fd: fd.as_raw_fd(),
            expected: "readable",
        });
    }
    Ok(InboundStream::from(fd))
}

/// Wrap a descriptor as the outbound (response) stream.
///
/// Fails with [`TransportError::WrongAccessMode`] if the descriptor was
/// opened read-only.
pub fn open_write_stream(fd: OwnedFd) -> Result<OutboundStream> {
    let mode = access_mode(&fd)?;
    if mode == libc::O_RDONLY {
        return Err(TransportError::WrongAccessMode {
            fd: fd.as_raw_fd(),
            expected: "writable",
        });
    }
    Ok(OutboundStream::from(fd))
}

/// Create a connected one-way pipe.
///
/// Bytes written to the returned [`OutboundStream`] are read from the
/// returned [`InboundStream`]. Both ends are close-on-exec.
pub fn pipe() -> Result<(InboundStream, OutboundStream)> {
    let (read_end, write_end) = pipe_cloexec()?;
    Ok((InboundStream::from(read_end), OutboundStream::from(write_end)))
}

/// Atomic on Linux, so a concurrent fork never inherits the ends.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn pipe_cloexec() -> Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: `fds` is a valid writable array of two descriptors.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(TransportError::Io(std::io::Error::last_os_error()));
    }

    // SAFETY: pipe2(2) succeeded, so both descriptors are open and owned
    // exclusively by us.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn pipe_cloexec() -> Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: `fds` is a valid writable array of two descriptors.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(TransportError::Io(std::io::Error::last_os_error()));
    }

    // SAFETY: pipe(2) succeeded, so both descriptors are open and owned
    // exclusively by us.
    let (read_end, write_end) =
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(&read_end)?;
    set_cloexec(&write_end)?;
    Ok((read_end, write_end))
}

fn access_mode(fd: &OwnedFd) -> Result<libc::c_int> {
    let raw = fd.as_raw_fd();
    // SAFETY: `raw` belongs to a live OwnedFd; F_GETFL does not modify it.
    let flags = unsafe { libc::fcntl(raw, libc::F_GETFL) };
    if flags < 0 {
        return Err(TransportError::InvalidDescriptor {
            fd: raw,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(flags & libc::O_ACCMODE)
}

fn set_cloexec(fd: &OwnedFd) -> Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: `raw` belongs to a live OwnedFd for the duration of both calls.
    let rc = unsafe {
        let flags = libc::fcntl(raw, libc::F_GETFD);
        if flags < 0 {
            flags
        } else {
            libc::fcntl(raw, libc::F_SETFD, flags | libc::FD_CLOEXEC)
        }
    };
    if rc < 0 {
        return Err(TransportError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}
