//! Crate-wide error taxonomy.
//!
//! Every failure is detected where the bytes are parsed or validated and is
//! surfaced immediately.  Nothing is corrected or retried inside the codec,
//! container or ZIP layers.

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An output buffer could not be grown.
    #[error("Out of memory")]
    OutOfMemory,
    /// Malformed or truncated token/container stream.
    #[error("Invalid or truncated data")]
    InvalidData,
    /// Container magic bytes absent or wrong.
    #[error("Invalid magic bytes: {found}")]
    InvalidMagic { found: String },
    /// A recomputed checksum disagrees with the stored one.
    #[error("Checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    /// A back-reference is zero or reaches before the start of the output.
    #[error("Invalid match offset {offset} ({available} bytes produced)")]
    InvalidOffset { offset: usize, available: usize },
    /// A length field would overflow its encoding width.
    #[error("Output too large for its length field")]
    OutputTooLarge,
    #[error("Unsupported compression method {0}")]
    UnsupportedCompressionMethod(u16),
    #[error("Unsupported LZMA2 chunk type {0:#04x}")]
    UnsupportedLzma2Chunk(u8),
    #[error("Invalid ZIP archive: {0}")]
    InvalidZipArchive(&'static str),
    #[error("ZIP entry size mismatch: declared {expected}, got {actual}")]
    ZipUncompressSizeMismatch { expected: u64, actual: u64 },
}

impl Error {
    /// Build an [`Error::InvalidMagic`] carrying the offending bytes as hex.
    pub fn invalid_magic(found: &[u8]) -> Self {
        Error::InvalidMagic { found: hex::encode(found) }
    }
}

/// All cursor reads in this crate run over in-memory slices, so the only
/// reachable I/O error is running off the end of the input.
impl From<io::Error> for Error {
    fn from(_: io::Error) -> Self {
        Error::InvalidData
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_invalid_data() {
        let e: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(e, Error::InvalidData);
    }

    #[test]
    fn invalid_magic_formats_hex() {
        let e = Error::invalid_magic(&[0xde, 0xad]);
        assert_eq!(e.to_string(), "Invalid magic bytes: dead");
    }
}
