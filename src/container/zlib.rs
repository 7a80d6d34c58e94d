//! Zlib-like framing: a real RFC 1950 header and Adler32 trailer around the
//! deflate-like payload.
//!
//! ```text
//! CMF=78 FLG  payload  adler32:u32be
//! ```
//!
//! FLG is picked from the level the way zlib does it, so `(CMF << 8 | FLG)`
//! is always a multiple of 31.  The payload itself is not RFC 1951.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::io::{Cursor, Read};

use super::check_magic;
use crate::checksum::adler32;
use crate::codec::{deflate, Codec, CodecId, Level};
use crate::error::{Error, Result};

/// Header written at the default level.
pub const MAGIC: [u8; 2] = [CMF, 0x9C];

const CMF:   u8 = 0x78;
const FDICT: u8 = 0x20;

fn flg_for(level: Level) -> u8 {
    match level.get() {
        0 | 1 => 0x01,
        2..=5 => 0x5E,
        6     => 0x9C,
        _     => 0xDA,
    }
}

fn header_is_valid(cmf: u8, flg: u8) -> bool {
    cmf == CMF && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0 && flg & FDICT == 0
}

/// Check if data starts with a header this decoder accepts.
pub fn is_zlib(data: &[u8]) -> bool {
    data.len() >= 2 && header_is_valid(data[0], data[1])
}

pub fn encode(data: &[u8], level: Level) -> Result<Vec<u8>> {
    let payload = deflate::encode(data, level)?;
    let mut out = Vec::new();
    out.try_reserve(2 + payload.len() + 4)?;
    out.write_u8(CMF)?;
    out.write_u8(flg_for(level))?;
    out.extend_from_slice(&payload);
    out.write_u32::<BigEndian>(adler32(data))?;

    debug!("zlib-like: {} -> {} bytes", data.len(), out.len());
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    // FLG varies with the level, so only CMF can be matched on its own.
    check_magic(data, &[CMF])?;
    let mut cur = Cursor::new(data);
    let cmf = cur.read_u8()?;
    let flg = cur.read_u8()?;
    if !header_is_valid(cmf, flg) {
        return Err(Error::invalid_magic(&[cmf, flg]));
    }

    let (out, used) = deflate::decode_prefix(&data[2..])?;
    cur.set_position((2 + used) as u64);

    let stored = cur.read_u32::<BigEndian>()?;
    if cur.read(&mut [0u8; 1])? != 0 {
        debug!("zlib-like: trailing bytes after Adler32");
        return Err(Error::InvalidData);
    }

    let actual = adler32(&out);
    if stored != actual {
        return Err(Error::ChecksumMismatch { expected: stored, actual });
    }
    Ok(out)
}

pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn codec_id(&self) -> CodecId { CodecId::Zlib }
    fn compress(&self, data: &[u8], level: Level) -> Result<Vec<u8>> { encode(data, level) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { decode(data) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_pass_fcheck() {
        for l in 0..=9 {
            let enc = encode(b"x", Level::new(l)).unwrap();
            assert!(is_zlib(&enc), "level {l}");
        }
        assert!(is_zlib(&MAGIC));
        assert!(!is_zlib(&[0x78, 0x9D]));
    }

    #[test]
    fn test_trailer_is_big_endian_adler32() {
        let enc = encode(b"Wikipedia", Level::DEFAULT).unwrap();
        assert_eq!(&enc[enc.len() - 4..], &[0x11, 0xE6, 0x03, 0x98]);
        assert_eq!(decode(&enc).unwrap(), b"Wikipedia");
    }

    #[test]
    fn test_roundtrip() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i / 7 % 256) as u8).collect();
        for l in [0, 3, 6, 9] {
            assert_eq!(decode(&encode(&data, Level::new(l)).unwrap()).unwrap(), data);
        }
        assert_eq!(decode(&encode(b"", Level::DEFAULT).unwrap()).unwrap(), b"");
    }

    #[test]
    fn test_every_trailer_bit_flip_is_checksum_mismatch() {
        let enc = encode(b"checksummed contents", Level::DEFAULT).unwrap();
        for byte in enc.len() - 4..enc.len() {
            for bit in 0..8 {
                let mut bad = enc.clone();
                bad[byte] ^= 1 << bit;
                assert!(matches!(decode(&bad), Err(Error::ChecksumMismatch { .. })));
            }
        }
    }

    #[test]
    fn test_bad_header_is_invalid_magic() {
        let mut enc = encode(b"abc", Level::DEFAULT).unwrap();
        enc[1] ^= 0x01;
        assert!(matches!(decode(&enc), Err(Error::InvalidMagic { .. })));
        // FDICT set with a valid FCHECK.
        assert!(matches!(decode(&[0x78, 0xBB, 0x00, 0, 0, 0, 1]), Err(Error::InvalidMagic { .. })));
    }

    #[test]
    fn test_short_foreign_input_is_invalid_magic() {
        assert!(matches!(decode(&[0x00]), Err(Error::InvalidMagic { .. })));
        assert_eq!(decode(&[CMF]), Err(Error::InvalidData));
        assert_eq!(decode(b""), Err(Error::InvalidData));
    }

    #[test]
    fn test_truncation_is_invalid_data() {
        let enc = encode(b"zlib zlib zlib zlib zlib", Level::DEFAULT).unwrap();
        for cut in 0..enc.len() {
            assert_eq!(decode(&enc[..cut]), Err(Error::InvalidData), "cut at {cut}");
        }
    }
}
