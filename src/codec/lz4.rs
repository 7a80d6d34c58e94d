//! Lz4-like block codec.
//!
//! Each sequence is:
//!
//! ```text
//! token:u8  [lit ext...]  literals  [off:u16le  [match ext...]]
//! ```
//!
//! The token's high nibble is the literal count, the low nibble the match
//! length minus [`MIN_MATCH`].  A nibble of 15 is followed by extension
//! bytes; each adds its value and a byte of 255 means another one follows.
//! A block always ends with a literal-only sequence whose low nibble is 0.
//!
//! Matching uses a flat (single candidate per bucket) hash table for speed.
//! The standalone [`encode`] prepends the little-endian `u32` uncompressed
//! size, the same framing `lz4_flex::compress_prepend_size` uses, although
//! the block layout here is this crate's own.

use log::debug;

use super::{alloc_output, apply_token, Codec, CodecId, Level, SliceReader, Token};
use crate::error::{Error, Result};
use crate::matchfinder::{MatchFinder, MatchParams};

pub const MIN_MATCH:  usize = 4;
pub const MAX_MATCH:  usize = u16::MAX as usize + MIN_MATCH;
pub const MAX_OFFSET: usize = u16::MAX as usize;
pub const HASH_BITS:  u32 = 12;

const NIBBLE_OVERFLOW: usize = 15;

/// An extension chain of `n` bytes yields at most `255 * n` of length.
const MAX_EXPANSION: usize = 255;

const PARAMS: MatchParams = MatchParams {
    min_match:  MIN_MATCH,
    max_match:  MAX_MATCH,
    max_offset: MAX_OFFSET,
    max_chain:  1,
    hash_bits:  HASH_BITS,
};

fn write_length_ext(out: &mut Vec<u8>, mut n: usize) {
    while n >= 255 {
        out.push(255);
        n -= 255;
    }
    out.push(n as u8);
}

fn write_sequence(out: &mut Vec<u8>, literals: &[u8], matched: Option<(usize, usize)>) {
    let lit_len = literals.len();
    let match_code = matched.map_or(0, |(_, length)| length - MIN_MATCH);

    let token = (lit_len.min(NIBBLE_OVERFLOW) << 4) | match_code.min(NIBBLE_OVERFLOW);
    out.push(token as u8);
    if lit_len >= NIBBLE_OVERFLOW {
        write_length_ext(out, lit_len - NIBBLE_OVERFLOW);
    }
    out.extend_from_slice(literals);

    if let Some((offset, _)) = matched {
        out.extend_from_slice(&(offset as u16).to_le_bytes());
        if match_code >= NIBBLE_OVERFLOW {
            write_length_ext(out, match_code - NIBBLE_OVERFLOW);
        }
    }
}

fn read_length(r: &mut SliceReader<'_>, nibble: usize) -> Result<usize> {
    let mut len = nibble;
    if nibble == NIBBLE_OVERFLOW {
        loop {
            let b = r.u8()?;
            len = len.checked_add(b as usize).ok_or(Error::InvalidData)?;
            if b != 255 {
                break;
            }
        }
    }
    Ok(len)
}

/// Compress `data` into a bare block.
pub fn encode_block(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = alloc_output(data.len() + data.len() / 255 + 16)?;
    let mut finder = MatchFinder::new(data, PARAMS);

    let mut anchor = 0;
    let mut pos = 0;
    while pos < data.len() {
        match finder.find(pos) {
            Some(m) => {
                write_sequence(&mut out, &data[anchor..pos], Some((m.offset, m.length)));
                finder.insert_range(pos, pos + m.length);
                pos += m.length;
                anchor = pos;
            }
            None => {
                finder.insert(pos);
                pos += 1;
            }
        }
    }
    write_sequence(&mut out, &data[anchor..], None);
    out.shrink_to_fit();
    Ok(out)
}

/// Decode a bare block that must produce exactly `expected_len` bytes.
pub fn decode_block(block: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut r = SliceReader::new(block);
    let mut out = alloc_output(expected_len.min(block.len().saturating_mul(MAX_EXPANSION)))?;

    loop {
        let token = r.u8()? as usize;

        let lit_len = read_length(&mut r, token >> 4)?;
        let literals = r.take(lit_len)?;
        apply_token(&mut out, Token::Literal(literals), expected_len)?;

        if r.is_empty() {
            // Final sequence: literals only.
            if token & 0x0F != 0 {
                return Err(Error::InvalidData);
            }
            break;
        }

        let offset = r.u16_le()? as usize;
        let length = read_length(&mut r, token & 0x0F)?
            .checked_add(MIN_MATCH)
            .filter(|&l| l <= MAX_MATCH)
            .ok_or(Error::InvalidData)?;
        apply_token(&mut out, Token::Match { offset, length }, expected_len)?;
    }

    if out.len() != expected_len {
        debug!("lz4-like: produced {} of {} declared bytes", out.len(), expected_len);
        return Err(Error::InvalidData);
    }
    Ok(out)
}

/// Size-prepended block: `u32le uncompressed length` then the block.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let size = u32::try_from(data.len()).map_err(|_| Error::OutputTooLarge)?;
    let block = encode_block(data)?;
    let mut out = alloc_output(4 + block.len())?;
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&block);
    debug!("lz4-like: {} -> {} bytes", data.len(), out.len());
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut r = SliceReader::new(data);
    let size = r.u32_le()? as usize;
    decode_block(&data[r.position()..], size)
}

/// Single fixed-effort mode; the level is ignored.
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn codec_id(&self) -> CodecId { CodecId::Lz4 }
    fn compress(&self, data: &[u8], _: Level) -> Result<Vec<u8>> { encode(data) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { decode(data) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encoding() {
        assert_eq!(
            encode(b"aaaaaaaaaa").unwrap(),
            [10, 0, 0, 0, 0x15, b'a', 1, 0, 0x00]
        );
        assert_eq!(encode(b"").unwrap(), [0, 0, 0, 0, 0x00]);
    }

    #[test]
    fn test_length_extension_bytes() {
        let mut out = Vec::new();
        write_length_ext(&mut out, 0);
        write_length_ext(&mut out, 254);
        write_length_ext(&mut out, 255);
        write_length_ext(&mut out, 600);
        assert_eq!(out, [0, 254, 255, 0, 255, 255, 90]);
    }

    #[test]
    fn test_long_literals_and_matches_roundtrip() {
        let noise: Vec<u8> = (0..1000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 11) as u8)
            .collect();
        assert_eq!(decode(&encode(&noise).unwrap()).unwrap(), noise);

        let zeros = vec![0u8; 100_000];
        let enc = encode(&zeros).unwrap();
        assert!(enc.len() < 1000);
        assert_eq!(decode(&enc).unwrap(), zeros);
    }

    #[test]
    fn test_roundtrip_text() {
        let text = b"the quick brown fox jumps over the lazy dog; the quick brown fox \
                     jumps over the lazy dog again and again and again";
        assert_eq!(decode(&encode(text).unwrap()).unwrap(), text);
    }

    #[test]
    fn test_run_compaction() {
        let data = vec![9u8; 64];
        assert!(encode(&data).unwrap().len() < data.len());
    }

    #[test]
    fn test_rejects_zero_offset() {
        assert_eq!(
            decode_block(&[0x10, b'a', 0, 0, 0x00], 5),
            Err(Error::InvalidOffset { offset: 0, available: 1 })
        );
    }

    #[test]
    fn test_rejects_bad_endings() {
        // Stream ends right after a match.
        assert_eq!(decode_block(&[0x10, b'a', 1, 0], 5), Err(Error::InvalidData));
        // Final literal-only sequence with a match nibble.
        assert_eq!(decode_block(&[0x11, b'a'], 1), Err(Error::InvalidData));
        // No sequences at all.
        assert_eq!(decode_block(&[], 0), Err(Error::InvalidData));
        // Declared literal count runs past the block.
        assert_eq!(decode_block(&[0xF0, 10, b'a'], 25), Err(Error::InvalidData));
    }

    #[test]
    fn test_truncation_is_invalid_data() {
        let enc = encode(b"abcdabcdabcdabcd________________xyzw").unwrap();
        for cut in 0..enc.len() {
            assert_eq!(decode(&enc[..cut]), Err(Error::InvalidData), "cut at {cut}");
        }
    }
}
