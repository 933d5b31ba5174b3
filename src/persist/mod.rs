//! Binary codec and status-file primitives for checkpointing
//!
//! All fixed-width integers in the checkpoint files are little-endian, so
//! a checkpoint written on one architecture restores on any other.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::warn;

use crate::types::FileOffset;

/// File name of the dictionary checkpoint within a checkpoint directory.
pub const MAPPING_FILE: &str = "mapping.bin";
/// File name of the forward-index checkpoint.
pub const FORWARD_FILE: &str = "forward.bin";
/// File name of the inverted-index checkpoint.
pub const INVERTED_FILE: &str = "inverted.bin";

pub fn write_u64<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a leading u64, treating a clean end-of-stream as absence.
///
/// A completely empty file is a valid serialization of an empty component,
/// so the first read of every `load` goes through this helper.
pub fn read_u64_or_eof<R: Read>(r: &mut R) -> io::Result<Option<u64>> {
    let mut buf = [0u8; 8];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..])? {
            0 if filled == 0 => return Ok(None),
            0 => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated length header",
                ))
            }
            n => filled += n,
        }
    }
    Ok(Some(u64::from_le_bytes(buf)))
}

/// Write a length-prefixed byte string: u64 length, then the raw bytes.
pub fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_u64(w, bytes.len() as u64)?;
    w.write_all(bytes)
}

/// Read a length-prefixed byte string written by [`write_bytes`].
pub fn read_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = read_u64(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read the last processed offset from the status file.
///
/// A missing or empty file means offset 0; unparseable content also resets
/// to 0 but is worth a warning, since it usually indicates a torn write.
pub fn read_status_file(path: &Path) -> FileOffset {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read status file, assuming offset 0");
            return 0;
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }

    match trimmed.parse::<FileOffset>() {
        Ok(offset) => offset,
        Err(_) => {
            warn!(path = %path.display(), "malformed status file content, resetting offset to 0");
            0
        }
    }
}

/// Overwrite the status file with the given offset (ASCII decimal).
pub fn write_status_file(path: &Path, offset: FileOffset) -> io::Result<()> {
    fs::write(path, offset.to_string())
}
