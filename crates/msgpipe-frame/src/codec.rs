use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: payload length (4) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload the 4-byte length prefix can describe.
pub const MAX_FRAME_PAYLOAD: usize = u32::MAX as usize;

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────────────┐
/// │ Length       │ Payload         │
/// │ (4B LE, u32) │ (Length bytes)  │
/// └──────────────┴─────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode the payload length from a frame header.
pub fn decode_length(header: [u8; HEADER_SIZE]) -> usize {
    u32::from_le_bytes(header) as usize
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone, Default)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: unbounded (the peer is
    /// trusted and the 4-byte prefix is the only limit).
    pub max_payload_size: Option<usize>,
}

impl FrameConfig {
    /// Effective payload limit, never above what the prefix can carry.
    pub fn limit(&self) -> usize {
        self.max_payload_size
            .map_or(MAX_FRAME_PAYLOAD, |max| max.min(MAX_FRAME_PAYLOAD))
    }

    pub(crate) fn check(&self, size: usize) -> Result<()> {
        let max = self.limit();
        if size > max {
            return Err(FrameError::PayloadTooLarge { size, max });
        }
        Ok(())
    }
}
