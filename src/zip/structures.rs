//! Fixed ZIP records, bit-exact with APPNOTE.
//!
//! Every record is little-endian.  Variable-length fields (name, extra,
//! comment) follow the fixed part and are handled by the reader/writer.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Version "made by"/"needed": 2.0, the first with deflate and directories.
pub const VERSION: u16 = 20;

/// General-purpose bit 11: name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;
/// General-purpose bit 0: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 1 << 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    /// The deflate-like token stream, not RFC 1951.
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            CompressionMethod::Stored     => 0,
            CompressionMethod::Deflate    => 8,
            CompressionMethod::Unknown(v) => v,
        }
    }
}

fn check_signature<R: Read>(reader: &mut R, expected: u32, what: &'static str) -> Result<()> {
    if reader.read_u32::<LittleEndian>()? != expected {
        return Err(Error::InvalidZipArchive(what));
    }
    Ok(())
}

// ── End of central directory ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndOfCentralDirectory {
    pub disk_number:   u16,
    pub disk_with_cd:  u16,
    pub disk_entries:  u16,
    pub total_entries: u16,
    pub cd_size:       u32,
    pub cd_offset:     u32,
    pub comment_len:   u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x0605_4b50;
    pub const SIZE: usize = 22;

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFF_FFFF
            || self.cd_offset == 0xFFFF_FFFF
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(Self::SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.disk_number)?;
        writer.write_u16::<LittleEndian>(self.disk_with_cd)?;
        writer.write_u16::<LittleEndian>(self.disk_entries)?;
        writer.write_u16::<LittleEndian>(self.total_entries)?;
        writer.write_u32::<LittleEndian>(self.cd_size)?;
        writer.write_u32::<LittleEndian>(self.cd_offset)?;
        writer.write_u16::<LittleEndian>(self.comment_len)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        check_signature(&mut reader, Self::SIGNATURE, "bad end of central directory signature")?;
        Ok(Self {
            disk_number:   reader.read_u16::<LittleEndian>()?,
            disk_with_cd:  reader.read_u16::<LittleEndian>()?,
            disk_entries:  reader.read_u16::<LittleEndian>()?,
            total_entries: reader.read_u16::<LittleEndian>()?,
            cd_size:       reader.read_u32::<LittleEndian>()?,
            cd_offset:     reader.read_u32::<LittleEndian>()?,
            comment_len:   reader.read_u16::<LittleEndian>()?,
        })
    }
}

// ── Central directory file header ────────────────────────────────────────────

/// Fixed 46-byte part of a central directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CentralDirectoryHeader {
    pub version_made_by:    u16,
    pub version_needed:     u16,
    pub flags:              u16,
    pub method:             u16,
    pub last_mod_time:      u16,
    pub last_mod_date:      u16,
    pub crc32:              u32,
    pub compressed_size:    u32,
    pub uncompressed_size:  u32,
    pub name_len:           u16,
    pub extra_len:          u16,
    pub comment_len:        u16,
    pub disk_number_start:  u16,
    pub internal_attrs:     u16,
    pub external_attrs:     u32,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: u32 = 0x0201_4b50;
    pub const SIZE: usize = 46;

    /// Bytes this record spans including its variable fields.
    pub fn record_len(&self) -> usize {
        Self::SIZE + self.name_len as usize + self.extra_len as usize + self.comment_len as usize
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(Self::SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.version_made_by)?;
        writer.write_u16::<LittleEndian>(self.version_needed)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.method)?;
        writer.write_u16::<LittleEndian>(self.last_mod_time)?;
        writer.write_u16::<LittleEndian>(self.last_mod_date)?;
        writer.write_u32::<LittleEndian>(self.crc32)?;
        writer.write_u32::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u16::<LittleEndian>(self.name_len)?;
        writer.write_u16::<LittleEndian>(self.extra_len)?;
        writer.write_u16::<LittleEndian>(self.comment_len)?;
        writer.write_u16::<LittleEndian>(self.disk_number_start)?;
        writer.write_u16::<LittleEndian>(self.internal_attrs)?;
        writer.write_u32::<LittleEndian>(self.external_attrs)?;
        writer.write_u32::<LittleEndian>(self.local_header_offset)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        check_signature(&mut reader, Self::SIGNATURE, "bad central directory header signature")?;
        Ok(Self {
            version_made_by:     reader.read_u16::<LittleEndian>()?,
            version_needed:      reader.read_u16::<LittleEndian>()?,
            flags:               reader.read_u16::<LittleEndian>()?,
            method:              reader.read_u16::<LittleEndian>()?,
            last_mod_time:       reader.read_u16::<LittleEndian>()?,
            last_mod_date:       reader.read_u16::<LittleEndian>()?,
            crc32:               reader.read_u32::<LittleEndian>()?,
            compressed_size:     reader.read_u32::<LittleEndian>()?,
            uncompressed_size:   reader.read_u32::<LittleEndian>()?,
            name_len:            reader.read_u16::<LittleEndian>()?,
            extra_len:           reader.read_u16::<LittleEndian>()?,
            comment_len:         reader.read_u16::<LittleEndian>()?,
            disk_number_start:   reader.read_u16::<LittleEndian>()?,
            internal_attrs:      reader.read_u16::<LittleEndian>()?,
            external_attrs:      reader.read_u32::<LittleEndian>()?,
            local_header_offset: reader.read_u32::<LittleEndian>()?,
        })
    }
}

// ── Local file header ────────────────────────────────────────────────────────

/// Fixed 30-byte part of a local file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalFileHeader {
    pub version_needed:    u16,
    pub flags:             u16,
    pub method:            u16,
    pub last_mod_time:     u16,
    pub last_mod_date:     u16,
    pub crc32:             u32,
    pub compressed_size:   u32,
    pub uncompressed_size: u32,
    pub name_len:          u16,
    pub extra_len:         u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x0403_4b50;
    pub const SIZE: usize = 30;

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(Self::SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.version_needed)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.method)?;
        writer.write_u16::<LittleEndian>(self.last_mod_time)?;
        writer.write_u16::<LittleEndian>(self.last_mod_date)?;
        writer.write_u32::<LittleEndian>(self.crc32)?;
        writer.write_u32::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u16::<LittleEndian>(self.name_len)?;
        writer.write_u16::<LittleEndian>(self.extra_len)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        check_signature(&mut reader, Self::SIGNATURE, "bad local file header signature")?;
        Ok(Self {
            version_needed:    reader.read_u16::<LittleEndian>()?,
            flags:             reader.read_u16::<LittleEndian>()?,
            method:            reader.read_u16::<LittleEndian>()?,
            last_mod_time:     reader.read_u16::<LittleEndian>()?,
            last_mod_date:     reader.read_u16::<LittleEndian>()?,
            crc32:             reader.read_u32::<LittleEndian>()?,
            compressed_size:   reader.read_u32::<LittleEndian>()?,
            uncompressed_size: reader.read_u32::<LittleEndian>()?,
            name_len:          reader.read_u16::<LittleEndian>()?,
            extra_len:         reader.read_u16::<LittleEndian>()?,
        })
    }
}

// ── Entry ────────────────────────────────────────────────────────────────────

/// One archive member, resolved from its central directory record and
/// local header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub name:                String,
    pub method:              CompressionMethod,
    pub flags:               u16,
    pub compressed_size:     u64,
    pub uncompressed_size:   u64,
    pub crc32:               u32,
    pub local_header_offset: u64,
    /// First byte of the entry's payload.
    pub data_offset:         u64,
    pub last_mod_time:       u16,
    pub last_mod_date:       u16,
}

impl ZipEntry {
    /// Directory entries end with '/'.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Modification date as (year, month, day).
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Modification time as (hour, minute, second).
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
