use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_length, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// Short reads are handled internally, so callers always get complete frames.
/// Never reads past the end of the current frame, so the stream can be
/// handed back with [`FrameReader::into_inner`] at a frame boundary.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame payload (blocking).
    ///
    /// Returns `Err(FrameError::ChannelClosed)` when EOF is reached. The
    /// error reports `received == 0` only if the stream ended before the
    /// first header byte.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        let mut header = [0u8; HEADER_SIZE];
        self.read_exact_into(&mut header)?;

        let len = decode_length(header);
        self.config.check(len)?;

        let mut payload = BytesMut::zeroed(len);
        self.read_exact_into(&mut payload).map_err(|err| match err {
            FrameError::ChannelClosed { expected, received } => FrameError::ChannelClosed {
                expected: HEADER_SIZE + expected,
                received: HEADER_SIZE + received,
            },
            other => other,
        })?;

        trace!(len, "read frame");
        Ok(payload.freeze())
    }

    /// Read exactly `n` bytes (blocking).
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        self.read_exact_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Fill `buf` completely, retrying short and interrupted reads.
    ///
    /// A read returning zero bytes while bytes are still owed fails with
    /// [`FrameError::ChannelClosed`].
    pub fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(FrameError::ChannelClosed {
                        expected: buf.len(),
                        received: filled,
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: Option<usize>) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::encode_frame;

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"hello"])));
        let payload = reader.read_frame().unwrap();
        assert_eq!(payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"one", b"two", b"three"])));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"three");
    }

    #[test]
    fn read_empty_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b""])));
        assert!(reader.read_frame().unwrap().is_empty());
    }

    #[test]
    fn read_frame_with_large_payload() {
        let payload = vec![0xAB; 256 * 1024];
        let mut reader = FrameReader::new(Cursor::new(wire(&[&payload])));
        assert_eq!(reader.read_frame().unwrap().as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[b"slow", b"and steady"]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"slow");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"and steady");
    }

    #[test]
    fn read_exact_collects_one_byte_chunks() {
        let byte_reader = ByteByByteReader {
            bytes: (0u8..64).collect(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let chunk = reader.read_exact(40).unwrap();
        assert_eq!(chunk.as_ref(), (0u8..40).collect::<Vec<_>>().as_slice());
        assert_eq!(reader.get_ref().pos, 40);
    }

    #[test]
    fn read_exact_zero_bytes_does_not_touch_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_exact(0).unwrap().is_empty());
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChannelClosed {
                expected: 4,
                received: 0
            }
        ));
        assert!(err.is_clean_close());
    }

    #[test]
    fn connection_closed_inside_header() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x05, 0x00, 0x00]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChannelClosed {
                expected: 4,
                received: 3
            }
        ));
        assert!(!err.is_clean_close());
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u32_le(16);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChannelClosed {
                expected: 20,
                received: 13
            }
        ));
        assert!(!err.is_clean_close());
    }

    #[test]
    fn connection_closed_right_after_header() {
        let mut partial = BytesMut::new();
        partial.put_u32_le(2);

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(!err.is_clean_close());
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        wire.put_u32_le(1024);

        let cfg = FrameConfig {
            max_payload_size: Some(16),
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge {
                size: 1024,
                max: 16
            }
        ));
    }

    #[test]
    fn does_not_read_past_frame_end() {
        let mut bytes = wire(&[b"first"]);
        bytes.extend_from_slice(b"trailing");

        let mut reader = FrameReader::new(Cursor::new(bytes));
        reader.read_frame().unwrap();

        let cursor = reader.into_inner();
        assert_eq!(cursor.position(), (HEADER_SIZE + 5) as u64);
    }

    #[test]
    fn max_payload_can_change_between_frames() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"first", b"second"])));
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"first");

        reader.set_max_payload_size(Some(4));
        assert_eq!(reader.config().max_payload_size, Some(4));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::PayloadTooLarge { size: 6, max: 4 })
        ));
    }

    #[test]
    fn would_block_propagates_io_error() {
        let reader = FailOnceThenData {
            kind: ErrorKind::WouldBlock,
            failed: false,
            bytes: wire(&[b"ok"]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = FailOnceThenData {
            kind: ErrorKind::Interrupted,
            failed: false,
            bytes: wire(&[b"ok"]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap().as_ref(), b"ok");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct FailOnceThenData {
        kind: ErrorKind,
        failed: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for FailOnceThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
