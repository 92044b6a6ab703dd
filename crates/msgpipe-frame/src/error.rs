/// Errors that can occur during framing and the readiness handshake.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the wire limit or the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The channel streams could not be opened.
    #[error("transport error: {0}")]
    Transport(#[from] msgpipe_transport::TransportError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The inbound stream ended while bytes were still owed.
    #[error("channel closed ({received} of {expected} bytes received)")]
    ChannelClosed { expected: usize, received: usize },

    /// The peer's first byte was not the ready sentinel.
    #[error("unexpected ready byte 0x{0:02X} (expected 0xFD)")]
    BadReadyByte(u8),

    /// Frame I/O was attempted before the ready byte was sent.
    #[error("ready byte has not been sent")]
    HandshakeNotSent,

    /// The ready byte was already sent on this channel.
    #[error("ready byte already sent")]
    HandshakeAlreadySent,
}

impl FrameError {
    /// True when the peer closed the stream exactly at a frame boundary.
    ///
    /// This is how a parent ends a session without a shutdown message.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, FrameError::ChannelClosed { received: 0, .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
