//! A framed channel over one inbound and one outbound stream.

use std::io::{Read, Write};

use bytes::Bytes;
use msgpipe_transport::{InboundStream, OutboundStream};
use tracing::info;

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::handshake;
use crate::reader::FrameReader;
use crate::writer::FrameWriter;

/// Channel over the inherited pipe descriptors.
pub type PipeChannel = Channel<InboundStream, OutboundStream>;

/// Owns the inbound and outbound streams of one side of a channel.
///
/// Frame I/O is refused until the readiness handshake has completed,
/// either by sending the ready byte ([`Channel::signal_ready`], child side)
/// or by receiving it ([`Channel::await_ready`], parent side).
pub struct Channel<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    ready: bool,
}

impl<R: Read, W: Write> Channel<R, W> {
    /// Create a channel with default configuration.
    pub fn new(inbound: R, outbound: W) -> Self {
        Self::with_config(inbound, outbound, FrameConfig::default())
    }

    /// Create a channel with explicit configuration for both directions.
    pub fn with_config(inbound: R, outbound: W, config: FrameConfig) -> Self {
        Self {
            reader: FrameReader::with_config(inbound, config.clone()),
            writer: FrameWriter::with_config(outbound, config),
            ready: false,
        }
    }

    /// Send the ready byte. Must be called exactly once, before any frame.
    pub fn signal_ready(&mut self) -> Result<()> {
        if self.ready {
            return Err(FrameError::HandshakeAlreadySent);
        }
        handshake::signal_ready(&mut self.writer)?;
        self.ready = true;
        Ok(())
    }

    /// Wait for the peer's ready byte. Must be called exactly once.
    pub fn await_ready(&mut self) -> Result<()> {
        if self.ready {
            return Err(FrameError::HandshakeAlreadySent);
        }
        handshake::await_ready(&mut self.reader)?;
        self.ready = true;
        Ok(())
    }

    /// Whether the readiness handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Read the next frame payload.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        self.ensure_ready()?;
        self.reader.read_frame()
    }

    /// Write one frame and flush it.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        self.writer.write_frame(payload)
    }

    /// Borrow the frame reader.
    pub fn reader(&self) -> &FrameReader<R> {
        &self.reader
    }

    /// Borrow the frame writer.
    pub fn writer(&self) -> &FrameWriter<W> {
        &self.writer
    }

    /// Consume the channel and return the inbound and outbound streams.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.ready {
            return Err(FrameError::HandshakeNotSent);
        }
        Ok(())
    }
}

#[cfg(unix)]
impl PipeChannel {
    /// Open a channel on descriptors inherited from the parent process.
    ///
    /// # Safety
    ///
    /// Neither descriptor may be owned by anything else in this process.
    pub unsafe fn open_inherited(read_fd: i32, write_fd: i32, config: FrameConfig) -> Result<Self> {
        // SAFETY: forwarded to the caller.
        let inbound = unsafe { msgpipe_transport::claim_inherited_fd(read_fd) }?;
        // SAFETY: forwarded to the caller.
        let outbound = unsafe { msgpipe_transport::claim_inherited_fd(write_fd) }?;

        let inbound = msgpipe_transport::open_read_stream(inbound)?;
        let outbound = msgpipe_transport::open_write_stream(outbound)?;

        info!(read_fd, write_fd, "opened channel on inherited descriptors");
        Ok(Self::with_config(inbound, outbound, config))
    }
}
