//! Building archives in memory.

use log::debug;

use super::structures::*;
use crate::checksum::crc32;
use crate::codec::{deflate, Level};
use crate::error::{Error, Result};

/// 1980-01-01, the DOS epoch.  Entries carry no real timestamp.
const DOS_DATE_EPOCH: u16 = (1 << 5) | 1;

fn narrow_u16(n: usize) -> Result<u16> {
    u16::try_from(n).map_err(|_| Error::OutputTooLarge)
}

fn narrow_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::OutputTooLarge)
}

/// Accumulates members and emits a complete archive on [`ZipWriter::finish`].
pub struct ZipWriter {
    out:     Vec<u8>,
    central: Vec<(CentralDirectoryHeader, Vec<u8>)>,
    level:   Level,
}

impl Default for ZipWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipWriter {
    pub fn new() -> Self {
        Self::with_level(Level::DEFAULT)
    }

    /// Level used for [`CompressionMethod::Deflate`] members.
    pub fn with_level(level: Level) -> Self {
        Self { out: Vec::new(), central: Vec::new(), level }
    }

    /// Append a member.  A deflate member that does not shrink is stored.
    pub fn add_file(&mut self, name: &str, data: &[u8], method: CompressionMethod) -> Result<()> {
        if self.central.len() >= u16::MAX as usize {
            return Err(Error::OutputTooLarge);
        }

        let (method, payload) = match method {
            CompressionMethod::Stored => (CompressionMethod::Stored, None),
            CompressionMethod::Deflate => {
                let packed = deflate::encode(data, self.level)?;
                if packed.len() < data.len() {
                    (CompressionMethod::Deflate, Some(packed))
                } else {
                    (CompressionMethod::Stored, None)
                }
            }
            CompressionMethod::Unknown(m) => return Err(Error::UnsupportedCompressionMethod(m)),
        };
        let payload = payload.as_deref().unwrap_or(data);

        let flags = if name.is_ascii() { 0 } else { FLAG_UTF8 };
        let crc = crc32(data);
        let local_header_offset = narrow_u32(self.out.len())?;
        let compressed_size = narrow_u32(payload.len())?;
        let uncompressed_size = narrow_u32(data.len())?;
        let name_len = narrow_u16(name.len())?;

        let lfh = LocalFileHeader {
            version_needed: VERSION,
            flags,
            method: method.as_u16(),
            last_mod_time: 0,
            last_mod_date: DOS_DATE_EPOCH,
            crc32: crc,
            compressed_size,
            uncompressed_size,
            name_len,
            extra_len: 0,
        };
        self.out.try_reserve(LocalFileHeader::SIZE + name.len() + payload.len())?;
        lfh.write(&mut self.out)?;
        self.out.extend_from_slice(name.as_bytes());
        self.out.extend_from_slice(payload);

        let cdfh = CentralDirectoryHeader {
            version_made_by: VERSION,
            version_needed: VERSION,
            flags,
            method: method.as_u16(),
            last_mod_time: 0,
            last_mod_date: DOS_DATE_EPOCH,
            crc32: crc,
            compressed_size,
            uncompressed_size,
            name_len,
            local_header_offset,
            ..Default::default()
        };
        self.central.push((cdfh, name.as_bytes().to_vec()));

        debug!("zip: added {name:?} as {method:?}, {} -> {} bytes", data.len(), payload.len());
        Ok(())
    }

    /// Directory member; a trailing '/' is added if missing.
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        if name.ends_with('/') {
            self.add_file(name, &[], CompressionMethod::Stored)
        } else {
            self.add_file(&format!("{name}/"), &[], CompressionMethod::Stored)
        }
    }

    /// Write the central directory and end record, returning the archive.
    pub fn finish(mut self, comment: &[u8]) -> Result<Vec<u8>> {
        let comment_len = narrow_u16(comment.len())?;
        let cd_offset = narrow_u32(self.out.len())?;
        if cd_offset == u32::MAX {
            return Err(Error::OutputTooLarge);
        }

        for (header, name) in &self.central {
            header.write(&mut self.out)?;
            self.out.extend_from_slice(name);
        }
        let cd_size = narrow_u32(self.out.len() - cd_offset as usize)?;

        let entries = narrow_u16(self.central.len())?;
        EndOfCentralDirectory {
            disk_entries: entries,
            total_entries: entries,
            cd_size,
            cd_offset,
            comment_len,
            ..Default::default()
        }
        .write(&mut self.out)?;
        self.out.extend_from_slice(comment);

        debug!("zip: finished archive, {} entries, {} bytes", entries, self.out.len());
        Ok(self.out)
    }
}
