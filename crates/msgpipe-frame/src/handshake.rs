use std::io::{Read, Write};

use tracing::debug;

use crate::error::{FrameError, Result};
use crate::reader::FrameReader;
use crate::writer::FrameWriter;

/// Sentinel byte the child writes once before any frame traffic.
pub const READY_BYTE: u8 = 0xFD;

/// Child side: tell the parent the channel is live.
///
/// Writes [`READY_BYTE`] and flushes immediately.
pub fn signal_ready<W: Write>(writer: &mut FrameWriter<W>) -> Result<()> {
    writer.write_raw(&[READY_BYTE])?;
    debug!("sent ready byte");
    Ok(())
}

/// Parent side: block until the child reports it is ready.
///
/// Fails with [`FrameError::BadReadyByte`] if the first byte is anything
/// other than [`READY_BYTE`].
pub fn await_ready<R: Read>(reader: &mut FrameReader<R>) -> Result<()> {
    let mut byte = [0u8; 1];
    reader.read_exact_into(&mut byte)?;
    if byte[0] != READY_BYTE {
        return Err(FrameError::BadReadyByte(byte[0]));
    }
    debug!("peer is ready");
    Ok(())
}
