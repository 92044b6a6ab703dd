//! Byte stream handles for a parent/child message channel.
//!
//! A channel is two unidirectional, blocking byte streams. The child reads
//! requests from an [`InboundStream`] and writes responses to an
//! [`OutboundStream`]. This is the lowest layer of msgpipe; framing and
//! dispatch build on top of the handles provided here.
//!
//! On Unix the streams are usually descriptors inherited from the parent
//! process ([`DEFAULT_READ_FD`] and [`DEFAULT_WRITE_FD`]).

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod fd;

pub use error::{Result, TransportError};
pub use stream::{InboundStream, OutboundStream};

#[cfg(unix)]
pub use fd::{claim_inherited_fd, open_read_stream, open_write_stream, pipe};

/// Descriptor the parent wires up for requests (child reads).
pub const DEFAULT_READ_FD: i32 = 3;

/// Descriptor the parent wires up for responses (child writes).
pub const DEFAULT_WRITE_FD: i32 = 4;
