use std::fs::File;
use std::io::{Read, Write};

/// Read-only end of a channel.
///
/// Reads block until data is available. A read of zero bytes means the
/// peer closed its end.
pub struct InboundStream {
    inner: File,
}

/// Write-only end of a channel.
pub struct OutboundStream {
    inner: File,
}

impl InboundStream {
    /// Wrap an already-open file handle.
    pub fn from_file(file: File) -> Self {
        Self { inner: file }
    }

    /// Consume the stream and return the underlying file handle.
    pub fn into_file(self) -> File {
        self.inner
    }
}

impl OutboundStream {
    /// Wrap an already-open file handle.
    pub fn from_file(file: File) -> Self {
        Self { inner: file }
    }

    /// Consume the stream and return the underlying file handle.
    pub fn into_file(self) -> File {
        self.inner
    }
}

impl Read for InboundStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for OutboundStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(unix)]
mod unix {
    use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

    use super::*;

    impl From<OwnedFd> for InboundStream {
        fn from(fd: OwnedFd) -> Self {
            Self::from_file(File::from(fd))
        }
    }

    impl From<OwnedFd> for OutboundStream {
        fn from(fd: OwnedFd) -> Self {
            Self::from_file(File::from(fd))
        }
    }

    impl AsFd for InboundStream {
        fn as_fd(&self) -> BorrowedFd<'_> {
            self.inner.as_fd()
        }
    }

    impl AsFd for OutboundStream {
        fn as_fd(&self) -> BorrowedFd<'_> {
            self.inner.as_fd()
        }
    }

    impl AsRawFd for InboundStream {
        fn as_raw_fd(&self) -> RawFd {
            self.inner.as_raw_fd()
        }
    }

    impl AsRawFd for OutboundStream {
        fn as_raw_fd(&self) -> RawFd {
            self.inner.as_raw_fd()
        }
    }
}

impl std::fmt::Debug for InboundStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("InboundStream");
        #[cfg(unix)]
        dbg.field("fd", &std::os::fd::AsRawFd::as_raw_fd(&self.inner));
        dbg.finish()
    }
}

impl std::fmt::Debug for OutboundStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("OutboundStream");
        #[cfg(unix)]
        dbg.field("fd", &std::os::fd::AsRawFd::as_raw_fd(&self.inner));
        dbg.finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pipe_carries_bytes_in_one_direction() {
        let (mut inbound, mut outbound) = crate::fd::pipe().unwrap();

        outbound.write_all(b"hello").unwrap();
        outbound.flush().unwrap();
        drop(outbound);

        let mut buf = Vec::new();
        inbound.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn debug_reports_descriptor() {
        let (inbound, outbound) = crate::fd::pipe().unwrap();
        assert!(format!("{inbound:?}").contains("fd"));
        assert!(format!("{outbound:?}").starts_with("OutboundStream"));
    }

    #[test]
    fn into_file_returns_handle() {
        let (inbound, outbound) = crate::fd::pipe().unwrap();
        let _ = inbound.into_file();
        let _ = outbound.into_file();
    }
}
