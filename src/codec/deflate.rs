//! Deflate-like byte-oriented LZ77 codec.
//!
//! # Wire format
//!
//! ```text
//! 0x00                      end of stream
//! 0xFF off:u16le len:u8     match, 1 <= len <= 255
//! 0xFE count:u8 value:u8    run of `count` copies of `value`
//! 0xFD b                    escaped literal (any byte value)
//! other                     literal as-is
//! ```
//!
//! Literal bytes `0x00`, `0xFD`, `0xFE` and `0xFF` are always escaped.
//! Runs of four or more identical bytes are collapsed first; matches found
//! by the hash-chain [`MatchFinder`] come next; everything else is literal.
//! Level 0 skips both and emits the input as one escaped literal block.
//!
//! This is not RFC 1951 DEFLATE.  It only round-trips with itself.

use log::debug;

use super::{alloc_output, apply_token, Codec, CodecId, Level, SliceReader, Token};
use crate::error::{Error, Result};
use crate::matchfinder::{MatchFinder, MatchParams};

pub const END:    u8 = 0x00;
pub const ESCAPE: u8 = 0xFD;
pub const RUN:    u8 = 0xFE;
pub const MATCH:  u8 = 0xFF;

/// Shortest match emitted.  A match token is 4 bytes, so 5 is the first gain.
pub const MIN_MATCH:  usize = 5;
pub const MAX_MATCH:  usize = 255;
pub const MIN_RUN:    usize = 4;
pub const MAX_RUN:    usize = 255;
pub const MAX_OFFSET: usize = u16::MAX as usize;

const HASH_BITS: u32 = 15;

#[inline]
fn is_reserved(b: u8) -> bool {
    matches!(b, END | ESCAPE | RUN | MATCH)
}

/// Window and chain depth for a level; `None` disables matching.
fn match_params(level: Level) -> Option<MatchParams> {
    let (max_offset, max_chain) = match level.get() {
        0      => return None,
        1..=3  => (4 * 1024, 8),
        4..=6  => (16 * 1024, 32),
        _      => (MAX_OFFSET, 128),
    };
    Some(MatchParams {
        min_match: MIN_MATCH,
        max_match: MAX_MATCH,
        max_offset,
        max_chain,
        hash_bits: HASH_BITS,
    })
}

fn run_length(data: &[u8], pos: usize) -> usize {
    let b = data[pos];
    data[pos..].iter().take(MAX_RUN).take_while(|&&x| x == b).count()
}

fn write_literals(out: &mut Vec<u8>, literals: &[u8]) {
    for &b in literals {
        if is_reserved(b) {
            out.push(ESCAPE);
        }
        out.push(b);
    }
}

fn write_token(out: &mut Vec<u8>, token: Token<'_>) {
    match token {
        Token::Literal(bytes) => write_literals(out, bytes),
        Token::Run { byte, count } => out.extend_from_slice(&[RUN, count as u8, byte]),
        Token::Match { offset, length } => {
            let off = (offset as u16).to_le_bytes();
            out.extend_from_slice(&[MATCH, off[0], off[1], length as u8]);
        }
    }
}

/// Compress `data` into a terminated deflate-like token stream.
pub fn encode(data: &[u8], level: Level) -> Result<Vec<u8>> {
    let mut out = alloc_output(data.len() + data.len() / 8 + 1)?;
    let Some(params) = match_params(level) else {
        write_literals(&mut out, data);
        out.push(END);
        debug!("deflate-like: {} -> {} bytes stored as literals", data.len(), out.len());
        return Ok(out);
    };
    let mut finder = MatchFinder::new(data, params);

    let mut pos = 0;
    let mut literal_start = 0;
    while pos < data.len() {
        let run = run_length(data, pos);
        let token = if run >= MIN_RUN {
            Some(Token::Run { byte: data[pos], count: run })
        } else {
            finder.find(pos).map(|m| Token::Match { offset: m.offset, length: m.length })
        };

        match token {
            Some(token) => {
                write_token(&mut out, Token::Literal(&data[literal_start..pos]));
                write_token(&mut out, token);
                let step = token.output_len();
                finder.insert_range(pos, pos + step);
                pos += step;
                literal_start = pos;
            }
            None => {
                finder.insert(pos);
                pos += 1;
            }
        }
    }
    write_token(&mut out, Token::Literal(&data[literal_start..]));
    out.push(END);
    out.shrink_to_fit();

    debug!("deflate-like: {} -> {} bytes at level {}", data.len(), out.len(), level.get());
    Ok(out)
}

/// Decode one terminated stream at the start of `data`.
/// Returns the output and the number of input bytes consumed (terminator included).
pub fn decode_prefix(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    decode_prefix_limited(data, usize::MAX)
}

/// Like [`decode_prefix`], failing with [`Error::InvalidData`] as soon as
/// a token would take the output past `limit` bytes.
pub fn decode_prefix_limited(data: &[u8], limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut r = SliceReader::new(data);
    let mut out = alloc_output(data.len().saturating_mul(2).min(limit))?;

    loop {
        let start = r.position();
        let token = match r.u8()? {
            END => break,
            MATCH => {
                let offset = r.u16_le()? as usize;
                let length = r.u8()? as usize;
                Token::Match { offset, length }
            }
            RUN => {
                let count = r.u8()? as usize;
                let byte = r.u8()?;
                Token::Run { byte, count }
            }
            ESCAPE => Token::Literal(r.take(1)?),
            _ => {
                // Swallow the whole stretch of plain literals at once.
                while r.peek().is_some_and(|b| !is_reserved(b)) {
                    r.take(1)?;
                }
                Token::Literal(&data[start..r.position()])
            }
        };
        apply_token(&mut out, token, limit)?;
    }

    out.shrink_to_fit();
    Ok((out, r.position()))
}

/// Decode a complete stream; bytes after the terminator are rejected.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    decode_limited(data, usize::MAX)
}

/// Decode a complete stream whose output may not exceed `limit` bytes.
pub fn decode_limited(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let (out, consumed) = decode_prefix_limited(data, limit)?;
    if consumed != data.len() {
        debug!("deflate-like: {} trailing bytes after terminator", data.len() - consumed);
        return Err(Error::InvalidData);
    }
    Ok(out)
}

pub struct DeflateCodec;

impl Codec for DeflateCodec {
    fn codec_id(&self) -> CodecId { CodecId::Deflate }
    fn compress(&self, data: &[u8], level: Level) -> Result<Vec<u8>> { encode(data, level) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { decode(data) }
}
