//! Self-describing wrappers around the token codecs.
//!
//! | Format | Magic              | Payload       | Integrity                          |
//! |--------|--------------------|---------------|------------------------------------|
//! | gzip   | `1F 8B`            | deflate-like  | header check byte, CRC32 + size    |
//! | zlib   | `78 xx` (mod 31)   | deflate-like  | Adler32 (big-endian)               |
//! | xz     | `FD 37 7A 58 5A 00`| lzma2-like    | CRC32 on every structure           |
//!
//! Every decoder validates its own framing before handing bytes to the codec
//! and recomputes every declared checksum and size afterwards.  A mismatch is
//! an error; nothing is silently accepted.

pub mod gzip;
pub mod xz;
pub mod zlib;

use crate::error::{Error, Result};

/// Compare whatever prefix of `data` is available against `magic`.
/// A short input that still matches is truncated, not foreign.
pub(crate) fn check_magic(data: &[u8], magic: &[u8]) -> Result<()> {
    let n = data.len().min(magic.len());
    if data[..n] != magic[..n] {
        return Err(Error::invalid_magic(&data[..n]));
    }
    if n < magic.len() {
        return Err(Error::InvalidData);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_magic_prefixes() {
        assert_eq!(check_magic(b"PK\x03\x04", b"PK\x03\x04"), Ok(()));
        assert_eq!(check_magic(b"PK", b"PK\x03\x04"), Err(Error::InvalidData));
        assert_eq!(check_magic(b"", b"PK\x03\x04"), Err(Error::InvalidData));
        assert!(matches!(check_magic(b"PX", b"PK\x03\x04"), Err(Error::InvalidMagic { .. })));
    }
}
