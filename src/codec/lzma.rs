//! Lzma-like LZ77 codec with compact control bytes.
//!
//! # Token grammar
//!
//! ```text
//! 1LLLLLLL  [bytes]                 literal run, L in 1..=126
//! 11111111  len:u16le [bytes]       long literal run
//! 00xxNNNN  off:u8                  short match, length N+2, offset <= 255
//! 01xxNNNN  off:u16le [ext:u8]      long match, length N+2; N = 15 adds ext,
//!                                   giving up to 17 + 255
//! ```
//!
//! The `xx` bits are reserved and must be zero.  The raw token stream carries
//! no length of its own: [`decode_raw`] is told the expected output size
//! (xz-like chunks declare it), and the standalone [`encode`] prefixes a
//! little-endian `u32` size.
//!
//! Not compatible with real LZMA; the name only reflects its role inside the
//! xz-like container.

use log::debug;

use super::{alloc_output, apply_token, Codec, CodecId, Level, SliceReader, Token};
use crate::error::{Error, Result};
use crate::matchfinder::{MatchFinder, MatchParams};

pub const MIN_MATCH:  usize = 3;
pub const MAX_MATCH:  usize = 17 + 255;
pub const MAX_OFFSET: usize = u16::MAX as usize;
pub const MAX_CHAIN:  usize = 16;
const HASH_BITS: u32 = 16;

const LITERAL_FLAG:     u8 = 0x80;
const LONG_LITERAL:     u8 = 0xFF;
const MAX_SHORT_LITERAL: usize = 126;
const MAX_LITERAL_RUN:  usize = u16::MAX as usize;

const LONG_MATCH_FLAG:  u8 = 0x40;
const RESERVED_BITS:    u8 = 0x30;
const LENGTH_MASK:      u8 = 0x0F;
const LENGTH_OVERFLOW:  usize = 15;
const MAX_SHORT_OFFSET: usize = 0xFF;
const MAX_SHORT_LENGTH: usize = 16;

/// Most output a single input byte can stand for (a 2-byte short match of 17).
const MAX_EXPANSION: usize = 136;

const PARAMS: MatchParams = MatchParams {
    min_match:  MIN_MATCH,
    max_match:  MAX_MATCH,
    max_offset: MAX_OFFSET,
    max_chain:  MAX_CHAIN,
    hash_bits:  HASH_BITS,
};

fn write_literals(out: &mut Vec<u8>, literals: &[u8]) {
    for run in literals.chunks(MAX_LITERAL_RUN) {
        if run.len() <= MAX_SHORT_LITERAL {
            out.push(LITERAL_FLAG | run.len() as u8);
        } else {
            out.push(LONG_LITERAL);
            out.extend_from_slice(&(run.len() as u16).to_le_bytes());
        }
        out.extend_from_slice(run);
    }
}

fn write_match(out: &mut Vec<u8>, offset: usize, length: usize) {
    if offset <= MAX_SHORT_OFFSET && length <= MAX_SHORT_LENGTH {
        out.extend_from_slice(&[(length - 2) as u8, offset as u8]);
        return;
    }
    let nibble = (length - 2).min(LENGTH_OVERFLOW);
    out.push(LONG_MATCH_FLAG | nibble as u8);
    out.extend_from_slice(&(offset as u16).to_le_bytes());
    if nibble == LENGTH_OVERFLOW {
        out.push((length - 2 - LENGTH_OVERFLOW) as u8);
    }
}

/// A 3-byte match only pays off in the 2-byte short form.
#[inline]
fn worth_encoding(offset: usize, length: usize) -> bool {
    length > MIN_MATCH || offset <= MAX_SHORT_OFFSET
}

/// Compress `data` into a bare token stream.
pub fn encode_raw(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = alloc_output(data.len() + data.len() / 64 + 3)?;
    let mut finder = MatchFinder::new(data, PARAMS);

    let mut pos = 0;
    let mut literal_start = 0;
    while pos < data.len() {
        match finder.find(pos).filter(|m| worth_encoding(m.offset, m.length)) {
            Some(m) => {
                write_literals(&mut out, &data[literal_start..pos]);
                write_match(&mut out, m.offset, m.length);
                finder.insert_range(pos, pos + m.length);
                pos += m.length;
                literal_start = pos;
            }
            None => {
                finder.insert(pos);
                pos += 1;
            }
        }
    }
    write_literals(&mut out, &data[literal_start..]);
    out.shrink_to_fit();
    Ok(out)
}

/// Decode a bare token stream that must produce exactly `expected_len` bytes.
pub fn decode_raw(stream: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut r = SliceReader::new(stream);
    let mut out = alloc_output(expected_len.min(stream.len().saturating_mul(MAX_EXPANSION)))?;

    while !r.is_empty() {
        let ctrl = r.u8()?;
        let token = if ctrl & LITERAL_FLAG != 0 {
            let len = if ctrl == LONG_LITERAL {
                r.u16_le()? as usize
            } else {
                (ctrl & !LITERAL_FLAG) as usize
            };
            if len == 0 {
                return Err(Error::InvalidData);
            }
            Token::Literal(r.take(len)?)
        } else {
            if ctrl & RESERVED_BITS != 0 {
                return Err(Error::InvalidData);
            }
            let nibble = (ctrl & LENGTH_MASK) as usize;
            if ctrl & LONG_MATCH_FLAG == 0 {
                let offset = r.u8()? as usize;
                Token::Match { offset, length: nibble + 2 }
            } else {
                let offset = r.u16_le()? as usize;
                let mut length = nibble + 2;
                if nibble == LENGTH_OVERFLOW {
                    length += r.u8()? as usize;
                }
                Token::Match { offset, length }
            }
        };
        apply_token(&mut out, token, expected_len)?;
    }

    if out.len() != expected_len {
        debug!("lzma-like: produced {} of {} declared bytes", out.len(), expected_len);
        return Err(Error::InvalidData);
    }
    Ok(out)
}

/// Size-prefixed stream: `u32le uncompressed length` then tokens.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let size = u32::try_from(data.len()).map_err(|_| Error::OutputTooLarge)?;
    let raw = encode_raw(data)?;
    let mut out = alloc_output(4 + raw.len())?;
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&raw);
    debug!("lzma-like: {} -> {} bytes", data.len(), out.len());
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut r = SliceReader::new(data);
    let size = r.u32_le()? as usize;
    decode_raw(&data[r.position()..], size)
}

/// The token grammar has no tunable effort; the level is ignored.
pub struct LzmaCodec;

impl Codec for LzmaCodec {
    fn codec_id(&self) -> CodecId { CodecId::Lzma }
    fn compress(&self, data: &[u8], _: Level) -> Result<Vec<u8>> { encode(data) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { decode(data) }
}
