//! Length-prefixed framing over a pair of one-way byte streams.
//!
//! Every message on the wire is a frame:
//! - A 4-byte little-endian unsigned payload length
//! - Exactly that many payload bytes
//!
//! Before any frame is written, the child sends a single ready byte
//! ([`READY_BYTE`]) so the parent knows the channel is live.
//!
//! No partial reads, no buffer management in user code.

pub mod channel;
pub mod codec;
pub mod error;
pub mod handshake;
pub mod reader;
pub mod writer;

pub use channel::{Channel, PipeChannel};
pub use codec::{decode_length, encode_frame, FrameConfig, HEADER_SIZE, MAX_FRAME_PAYLOAD};
pub use error::{FrameError, Result};
pub use handshake::{await_ready, signal_ready, READY_BYTE};
pub use reader::FrameReader;
pub use writer::FrameWriter;
