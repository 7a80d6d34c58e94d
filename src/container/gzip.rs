//! Gzip-like framing around the deflate-like codec.
//!
//! ```text
//! 1F 8B  flags  check  [payload]  [crc32:u32le size:u32le]  00 00 00 00
//! ```
//!
//! * `flags` bit 0: payload present (clear only for empty input).
//! * `flags` bit 1: CRC32/size trailer present.
//! * `flags` bits 4–7: level the payload was produced at (informational).
//! * `check` is the low byte of [`header_hash`] over the magic and flags.
//!
//! Borrows gzip's magic but is not RFC 1952.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::io::{self, Cursor, Read, Write};

use super::check_magic;
use crate::checksum::{crc32, header_hash};
use crate::codec::{deflate, Codec, CodecId, Level};
use crate::error::{Error, Result};

pub const MAGIC: [u8; 2] = [0x1F, 0x8B];
pub const TERMINATOR: [u8; 4] = [0; 4];

pub const FLAG_PAYLOAD: u8 = 0x01;
pub const FLAG_TRAILER: u8 = 0x02;
const FLAG_RESERVED:   u8 = 0x0C;
const LEVEL_SHIFT:     u8 = 4;

/// Check if data starts with the gzip-like magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&MAGIC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipHeader {
    pub flags: u8,
}

impl GzipHeader {
    pub fn new(level: Level, has_payload: bool) -> Self {
        let mut flags = FLAG_TRAILER | (level.get() << LEVEL_SHIFT);
        if has_payload {
            flags |= FLAG_PAYLOAD;
        }
        Self { flags }
    }

    pub fn has_payload(&self) -> bool { self.flags & FLAG_PAYLOAD != 0 }
    pub fn has_trailer(&self) -> bool { self.flags & FLAG_TRAILER != 0 }
    pub fn level(&self) -> Level { Level::from(self.flags >> LEVEL_SHIFT) }

    fn check_byte(flags: u8) -> u8 {
        header_hash(&[MAGIC[0], MAGIC[1], flags]) as u8
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u8(self.flags)?;
        writer.write_u8(Self::check_byte(self.flags))?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::invalid_magic(&magic));
        }
        let flags = reader.read_u8()?;
        let stored = reader.read_u8()?;
        let actual = Self::check_byte(flags);
        if stored != actual {
            return Err(Error::ChecksumMismatch { expected: stored as u32, actual: actual as u32 });
        }
        if flags & FLAG_RESERVED != 0 {
            return Err(Error::InvalidData);
        }
        Ok(Self { flags })
    }
}

/// CRC32 and length (mod 2^32) of the uncompressed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    pub crc32: u32,
    pub isize: u32,
}

impl GzipTrailer {
    pub fn for_data(data: &[u8]) -> Self {
        Self { crc32: crc32(data), isize: data.len() as u32 }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.crc32)?;
        writer.write_u32::<LittleEndian>(self.isize)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        Ok(Self {
            crc32: reader.read_u32::<LittleEndian>()?,
            isize: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Fail unless this trailer describes `data`.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = Self::for_data(data);
        if actual.crc32 != self.crc32 {
            return Err(Error::ChecksumMismatch { expected: self.crc32, actual: actual.crc32 });
        }
        if actual.isize != self.isize {
            return Err(Error::InvalidData);
        }
        Ok(())
    }
}

pub fn encode(data: &[u8], level: Level) -> Result<Vec<u8>> {
    let header = GzipHeader::new(level, !data.is_empty());
    let payload = if header.has_payload() { deflate::encode(data, level)? } else { Vec::new() };

    let mut out = Vec::new();
    out.try_reserve(4 + payload.len() + 8 + TERMINATOR.len())?;
    header.write(&mut out)?;
    out.extend_from_slice(&payload);
    GzipTrailer::for_data(data).write(&mut out)?;
    out.extend_from_slice(&TERMINATOR);

    debug!("gzip-like: {} -> {} bytes", data.len(), out.len());
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    check_magic(data, &MAGIC)?;
    let mut cur = Cursor::new(data);
    let header = GzipHeader::read(&mut cur)?;

    let mut pos = cur.position() as usize;
    let out = if header.has_payload() {
        let (out, used) = deflate::decode_prefix(&data[pos..])?;
        pos += used;
        out
    } else {
        Vec::new()
    };
    cur.set_position(pos as u64);

    if header.has_trailer() {
        GzipTrailer::read(&mut cur)?.verify(&out)?;
    }

    let mut terminator = [0u8; 4];
    cur.read_exact(&mut terminator)?;
    if terminator != TERMINATOR || cur.position() as usize != data.len() {
        debug!("gzip-like: bad terminator or trailing bytes");
        return Err(Error::InvalidData);
    }
    Ok(out)
}

pub struct GzipCodec;

impl Codec for GzipCodec {
    fn codec_id(&self) -> CodecId { CodecId::Gzip }
    fn compress(&self, data: &[u8], level: Level) -> Result<Vec<u8>> { encode(data, level) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { decode(data) }
}
