//! Codec registry and the pieces shared by the token codecs.
//!
//! Three independent token codecs live here ([`deflate`], [`lzma`], [`lz4`]),
//! each with its own control-byte grammar.  They share nothing but the
//! conceptual [`Token`] shape, the output routine [`apply_token`] (which owns
//! the back-reference checks and the self-overlapping copy) and the
//! [`Codec`] capability.  The containers in [`crate::container`] implement
//! the same capability so a dispatcher can treat all six uniformly.

pub mod deflate;
pub mod lz4;
pub mod lzma;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::container::{gzip::GzipCodec, xz::XzCodec, zlib::ZlibCodec};
use crate::error::{Error, Result};

pub use deflate::DeflateCodec;
pub use lz4::Lz4Codec;
pub use lzma::LzmaCodec;

// ── Level ────────────────────────────────────────────────────────────────────

/// Compression effort, `0..=9`.  Out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    /// Store-only: no match search.
    pub const NONE:    Level = Level(0);
    pub const FASTEST: Level = Level(1);
    pub const DEFAULT: Level = Level(6);
    pub const BEST:    Level = Level(9);

    pub fn new(level: u32) -> Self {
        Level(level.min(9) as u8)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::DEFAULT
    }
}

impl From<u8> for Level {
    fn from(v: u8) -> Self {
        Level::new(v as u32)
    }
}

// ── CodecId ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    Deflate,
    Lzma,
    Lz4,
    Gzip,
    Zlib,
    Xz,
}

impl CodecId {
    pub const ALL: [CodecId; 6] = [
        CodecId::Deflate,
        CodecId::Lzma,
        CodecId::Lz4,
        CodecId::Gzip,
        CodecId::Zlib,
        CodecId::Xz,
    ];

    /// Human-readable name (for diagnostics only).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::Deflate => "deflate",
            CodecId::Lzma    => "lzma",
            CodecId::Lz4     => "lz4",
            CodecId::Gzip    => "gzip",
            CodecId::Zlib    => "zlib",
            CodecId::Xz      => "xz",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deflate" => Some(CodecId::Deflate),
            "lzma"    => Some(CodecId::Lzma),
            "lz4"     => Some(CodecId::Lz4),
            "gzip"    => Some(CodecId::Gzip),
            "zlib"    => Some(CodecId::Zlib),
            "xz"      => Some(CodecId::Xz),
            _         => None,
        }
    }

    /// Leading magic bytes for the container formats; raw token streams have none.
    pub fn magic(self) -> Option<&'static [u8]> {
        match self {
            CodecId::Gzip => Some(&crate::container::gzip::MAGIC),
            CodecId::Zlib => Some(&crate::container::zlib::MAGIC),
            CodecId::Xz   => Some(&crate::container::xz::HEADER_MAGIC),
            CodecId::Deflate | CodecId::Lzma | CodecId::Lz4 => None,
        }
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8], level: Level) -> Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Resolve a CodecId to its implementation.
pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::Deflate => Box::new(DeflateCodec),
        CodecId::Lzma    => Box::new(LzmaCodec),
        CodecId::Lz4     => Box::new(Lz4Codec),
        CodecId::Gzip    => Box::new(GzipCodec),
        CodecId::Zlib    => Box::new(ZlibCodec),
        CodecId::Xz      => Box::new(XzCodec),
    }
}

// ── Tokens ───────────────────────────────────────────────────────────────────

/// The unit every encoder emits and every decoder consumes.
/// Wire encodings differ per codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(&'a [u8]),
    Run { byte: u8, count: usize },
    Match { offset: usize, length: usize },
}

impl Token<'_> {
    /// Bytes this token produces.
    #[inline]
    pub fn output_len(&self) -> usize {
        match *self {
            Token::Literal(bytes)       => bytes.len(),
            Token::Run { count, .. }    => count,
            Token::Match { length, .. } => length,
        }
    }
}

/// Append the bytes `token` stands for to `out`.
///
/// Rejects a zero or out-of-range offset, zero-length runs and matches, and
/// anything that would grow `out` past `limit`.  Matches are copied one byte
/// at a time from the output itself, so `offset < length` repeats the tail.
pub(crate) fn apply_token(out: &mut Vec<u8>, token: Token<'_>, limit: usize) -> Result<()> {
    let produced = out.len();
    match token {
        Token::Run { count: 0, .. } | Token::Match { length: 0, .. } => {
            return Err(Error::InvalidData);
        }
        Token::Match { offset, .. } if offset == 0 || offset > produced => {
            return Err(Error::InvalidOffset { offset, available: produced });
        }
        _ => {}
    }
    if token.output_len() > limit.saturating_sub(produced) {
        return Err(Error::InvalidData);
    }
    out.try_reserve(token.output_len())?;

    match token {
        Token::Literal(bytes) => out.extend_from_slice(bytes),
        Token::Run { byte, count } => out.resize(produced + count, byte),
        Token::Match { offset, length } => {
            let start = produced - offset;
            for i in 0..length {
                let b = out[start + i];
                out.push(b);
            }
        }
    }
    Ok(())
}

/// Fresh output buffer with `capacity` reserved, reporting allocation failure.
pub(crate) fn alloc_output(capacity: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.try_reserve(capacity)?;
    Ok(out)
}

// ── Slice reader ─────────────────────────────────────────────────────────────

/// Forward-only reader over a byte slice.  Every read is bounds-checked and
/// fails with [`Error::InvalidData`] instead of slicing past the end.
pub(crate) struct SliceReader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> SliceReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    #[inline]
    pub(crate) fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::InvalidData);
        }
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    #[inline]
    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub(crate) fn u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub(crate) fn u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_clamps() {
        assert_eq!(Level::new(42), Level::BEST);
        assert_eq!(Level::from(3u8).get(), 3);
        assert_eq!(Level::default(), Level::DEFAULT);
    }

    #[test]
    fn codec_names_round_trip() {
        for id in CodecId::ALL {
            assert_eq!(CodecId::from_name(id.name()), Some(id));
            assert_eq!(get_codec(id).codec_id(), id);
        }
        assert_eq!(CodecId::from_name("ZLIB"), Some(CodecId::Zlib));
        assert_eq!(CodecId::from_name("brotli"), None);
    }

    #[test]
    fn only_containers_have_magic() {
        assert_eq!(CodecId::Gzip.magic(), Some(&[0x1F, 0x8B][..]));
        assert!(CodecId::Xz.magic().is_some());
        assert!(CodecId::Lz4.magic().is_none());
    }

    #[test]
    fn overlapping_match_repeats_tail() {
        let mut out = b"ab".to_vec();
        apply_token(&mut out, Token::Match { offset: 2, length: 7 }, usize::MAX).unwrap();
        assert_eq!(out, b"ababababa");
    }

    #[test]
    fn zero_offset_rejected() {
        let mut out = b"abc".to_vec();
        let err = apply_token(&mut out, Token::Match { offset: 0, length: 3 }, usize::MAX);
        assert_eq!(err, Err(Error::InvalidOffset { offset: 0, available: 3 }));
    }

    #[test]
    fn offset_before_start_rejected() {
        let mut out = b"abc".to_vec();
        let err = apply_token(&mut out, Token::Match { offset: 4, length: 1 }, usize::MAX);
        assert_eq!(err, Err(Error::InvalidOffset { offset: 4, available: 3 }));
        assert_eq!(out, b"abc");
    }

    #[test]
    fn limit_is_enforced() {
        let mut out = Vec::new();
        assert_eq!(
            apply_token(&mut out, Token::Run { byte: 1, count: 10 }, 9),
            Err(Error::InvalidData)
        );
        apply_token(&mut out, Token::Run { byte: 1, count: 9 }, 9).unwrap();
        assert_eq!(out, vec![1u8; 9]);
    }

    #[test]
    fn slice_reader_bounds() {
        let mut r = SliceReader::new(&[1, 2, 3]);
        assert_eq!(r.u16_le().unwrap(), 0x0201);
        assert_eq!(r.u16_be(), Err(Error::InvalidData));
        assert_eq!(r.u8().unwrap(), 3);
        assert!(r.is_empty());
        assert_eq!(r.take(1), Err(Error::InvalidData));
    }
}
