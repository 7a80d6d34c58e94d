//! Xz-like container: one block of lzma2-like chunks.
//!
//! # Layout
//!
//! ```text
//! stream header   FD 37 7A 58 5A 00 | flags 00 01 | crc32(flags)
//! block header    size | 00 | 21 01 props | 00 00 00 | crc32(header)
//! chunks          02 (unc-1):u16be (comp-1):u16be lzma-like tokens
//!                 01 (unc-1):u16be raw bytes
//!                 00
//! block padding   to a 4-byte boundary
//! check           crc32(uncompressed)
//! index           00 | count | unpadded size | uncompressed size | pad | crc32
//! stream footer   crc32(backward size ‖ flags) | backward size:u32le | flags | 59 5A
//! ```
//!
//! All CRCs are little-endian; the header/index varints use xz's 7-bit
//! little-endian groups.  Decoding is strict: every CRC, the index record,
//! the backward size and both magics are verified.
//!
//! The chunk payloads are the lzma-like codec, not real LZMA, so only
//! streams written by this module decode.

use log::{debug, trace};

use super::check_magic;
use crate::checksum::crc32;
use crate::codec::{alloc_output, lzma, Codec, CodecId, Level, SliceReader};
use crate::error::{Error, Result};

pub const HEADER_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];
pub const FOOTER_MAGIC: [u8; 2] = *b"YZ";

const CHECK_CRC32:  u8 = 0x01;
const STREAM_FLAGS: [u8; 2] = [0x00, CHECK_CRC32];

const FILTER_LZMA2: u8 = 0x21;
/// 64 KiB dictionary in LZMA2 property encoding; chunks never reach back further.
const DICT_PROPS: u8 = 0x08;
const BLOCK_HEADER_LEN: usize = 12;

/// Largest uncompressed span per chunk.
pub const CHUNK_SIZE: usize = 32 * 1024;

const CHUNK_END:    u8 = 0x00;
const CHUNK_STORED: u8 = 0x01;
const CHUNK_LZMA:   u8 = 0x02;
/// Control bytes at or above this are real LZMA chunks.
const CHUNK_LZMA_RAW: u8 = 0x80;

const MAX_VARINT_LEN: usize = 9;

/// Check if data starts with the xz-like stream magic.
pub fn is_xz(data: &[u8]) -> bool {
    data.starts_with(&HEADER_MAGIC)
}

// ── Small helpers ────────────────────────────────────────────────────────────

fn pad_to_four(out: &mut Vec<u8>, start: usize) {
    while (out.len() - start) % 4 != 0 {
        out.push(0);
    }
}

fn skip_padding(r: &mut SliceReader<'_>, start: usize) -> Result<()> {
    while (r.position() - start) % 4 != 0 {
        if r.u8()? != 0 {
            return Err(Error::InvalidData);
        }
    }
    Ok(())
}

fn verify_crc(stored: u32, bytes: &[u8]) -> Result<()> {
    let actual = crc32(bytes);
    if stored != actual {
        return Err(Error::ChecksumMismatch { expected: stored, actual });
    }
    Ok(())
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push(value as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn read_varint(r: &mut SliceReader<'_>) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let b = r.u8()?;
        value |= u64::from(b & 0x7F) << (7 * i);
        if b & 0x80 == 0 {
            // Non-minimal encodings end in a zero group.
            if i > 0 && b == 0 {
                return Err(Error::InvalidData);
            }
            return Ok(value);
        }
    }
    Err(Error::InvalidData)
}

fn u16_len(n: usize) -> Result<u16> {
    u16::try_from(n - 1).map_err(|_| Error::OutputTooLarge)
}

// ── Block header ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub filter_id:  u8,
    pub dict_props: u8,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self { filter_id: FILTER_LZMA2, dict_props: DICT_PROPS }
    }
}

impl BlockHeader {
    pub fn write(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.push((BLOCK_HEADER_LEN / 4 - 1) as u8);
        out.push(0x00); // one filter, no optional sizes
        out.extend_from_slice(&[self.filter_id, 0x01, self.dict_props]);
        pad_to_four(out, start);
        let crc = crc32(&out[start..]);
        out.extend_from_slice(&crc.to_le_bytes());
    }

    pub(crate) fn read(r: &mut SliceReader<'_>) -> Result<Self> {
        let size_byte = r.peek().ok_or(Error::InvalidData)?;
        if size_byte == 0 {
            // Index indicator: a stream without blocks is never written.
            return Err(Error::InvalidData);
        }
        let len = (size_byte as usize + 1) * 4;
        let raw = r.take(len)?;
        let (body, crc) = raw.split_at(len - 4);
        verify_crc(u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]), body)?;

        if len < BLOCK_HEADER_LEN {
            return Err(Error::InvalidData);
        }
        if body[1] != 0x00 {
            return Err(Error::UnsupportedCompressionMethod(body[1] as u16));
        }
        if body[2] != FILTER_LZMA2 {
            return Err(Error::UnsupportedCompressionMethod(body[2] as u16));
        }
        if body[3] != 0x01 || body[5..].iter().any(|&b| b != 0) {
            return Err(Error::InvalidData);
        }
        Ok(Self { filter_id: body[2], dict_props: body[4] })
    }
}

// ── Chunks ───────────────────────────────────────────────────────────────────

fn encode_chunk(out: &mut Vec<u8>, chunk: &[u8]) -> Result<()> {
    let unc = u16_len(chunk.len())?;
    let packed = lzma::encode_raw(chunk)?;
    if packed.len() < chunk.len() {
        out.push(CHUNK_LZMA);
        out.extend_from_slice(&unc.to_be_bytes());
        out.extend_from_slice(&u16_len(packed.len())?.to_be_bytes());
        out.extend_from_slice(&packed);
    } else {
        out.push(CHUNK_STORED);
        out.extend_from_slice(&unc.to_be_bytes());
        out.extend_from_slice(chunk);
    }
    Ok(())
}

/// Decode chunks up to and including the end marker.
/// Returns the output and the bytes consumed.
pub fn decode_chunks(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut r = SliceReader::new(data);
    let mut out = alloc_output(data.len().saturating_mul(2))?;

    loop {
        let ctrl = r.u8()?;
        match ctrl {
            CHUNK_END => break,
            CHUNK_STORED => {
                let unc = r.u16_be()? as usize + 1;
                let raw = r.take(unc)?;
                out.try_reserve(unc)?;
                out.extend_from_slice(raw);
                trace!("xz-like: stored chunk of {unc} bytes");
            }
            CHUNK_LZMA => {
                let unc = r.u16_be()? as usize + 1;
                let comp = r.u16_be()? as usize + 1;
                let chunk = lzma::decode_raw(r.take(comp)?, unc)?;
                out.try_reserve(unc)?;
                out.extend_from_slice(&chunk);
                trace!("xz-like: lzma chunk {comp} -> {unc} bytes");
            }
            c if c >= CHUNK_LZMA_RAW => return Err(Error::UnsupportedLzma2Chunk(c)),
            _ => return Err(Error::InvalidData),
        }
    }
    Ok((out, r.position()))
}

// ── Stream ───────────────────────────────────────────────────────────────────

pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = alloc_output(data.len() / 2 + 64)?;

    out.extend_from_slice(&HEADER_MAGIC);
    out.extend_from_slice(&STREAM_FLAGS);
    out.extend_from_slice(&crc32(&STREAM_FLAGS).to_le_bytes());

    let block_start = out.len();
    BlockHeader::default().write(&mut out);
    for chunk in data.chunks(CHUNK_SIZE) {
        encode_chunk(&mut out, chunk)?;
    }
    out.push(CHUNK_END);
    let unpadded_size = out.len() - block_start + 4;
    pad_to_four(&mut out, block_start);
    out.extend_from_slice(&crc32(data).to_le_bytes());

    let index_start = out.len();
    out.push(0x00);
    write_varint(&mut out, 1);
    write_varint(&mut out, unpadded_size as u64);
    write_varint(&mut out, data.len() as u64);
    pad_to_four(&mut out, index_start);
    let index_crc = crc32(&out[index_start..]);
    out.extend_from_slice(&index_crc.to_le_bytes());
    let index_size = out.len() - index_start;

    let backward = u32::try_from(index_size / 4 - 1).map_err(|_| Error::OutputTooLarge)?;
    let mut footer = [0u8; 6];
    footer[..4].copy_from_slice(&backward.to_le_bytes());
    footer[4..].copy_from_slice(&STREAM_FLAGS);
    out.extend_from_slice(&crc32(&footer).to_le_bytes());
    out.extend_from_slice(&footer);
    out.extend_from_slice(&FOOTER_MAGIC);

    debug!("xz-like: {} -> {} bytes", data.len(), out.len());
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    check_magic(data, &HEADER_MAGIC)?;
    let mut r = SliceReader::new(data);
    r.take(HEADER_MAGIC.len())?;
    let flags = r.take(2)?;
    verify_crc(r.u32_le()?, flags)?;
    if flags[0] != 0 {
        return Err(Error::InvalidData);
    }
    if flags[1] != CHECK_CRC32 {
        return Err(Error::UnsupportedCompressionMethod(flags[1] as u16));
    }

    // Block
    let block_start = r.position();
    BlockHeader::read(&mut r)?;
    let (out, used) = decode_chunks(&data[r.position()..])?;
    r.take(used)?;
    let unpadded_size = (r.position() - block_start + 4) as u64;
    skip_padding(&mut r, block_start)?;
    verify_crc(r.u32_le()?, &out)?;

    // Index
    let index_start = r.position();
    if r.u8()? != 0x00 || read_varint(&mut r)? != 1 {
        return Err(Error::InvalidData);
    }
    let record_unpadded = read_varint(&mut r)?;
    let record_size = read_varint(&mut r)?;
    if record_unpadded != unpadded_size || record_size != out.len() as u64 {
        debug!("xz-like: index record disagrees with block");
        return Err(Error::InvalidData);
    }
    skip_padding(&mut r, index_start)?;
    let index_body = &data[index_start..r.position()];
    verify_crc(r.u32_le()?, index_body)?;
    let index_size = r.position() - index_start;

    // Footer
    let footer_crc = r.u32_le()?;
    let footer = r.take(6)?;
    verify_crc(footer_crc, footer)?;
    let backward = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]) as usize;
    if (backward + 1) * 4 != index_size || footer[4..] != *flags {
        return Err(Error::InvalidData);
    }
    let magic = r.take(FOOTER_MAGIC.len())?;
    if magic != FOOTER_MAGIC {
        return Err(Error::invalid_magic(magic));
    }
    if !r.is_empty() {
        return Err(Error::InvalidData);
    }
    Ok(out)
}

/// Chunks use the lzma-like codec's fixed tuning; the level is ignored.
pub struct XzCodec;

impl Codec for XzCodec {
    fn codec_id(&self) -> CodecId { CodecId::Xz }
    fn compress(&self, data: &[u8], _: Level) -> Result<Vec<u8>> { encode(data) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { decode(data) }
}
