//! Opening archives and extracting entries from an in-memory buffer.

use log::{debug, trace};
use std::io::{Cursor, Read};

use super::structures::*;
use crate::checksum::crc32;
use crate::codec::{alloc_output, deflate};
use crate::error::{Error, Result};

/// Largest comment an EOCD record can carry, bounding the backward search.
const MAX_COMMENT_SIZE: usize = u16::MAX as usize;

/// Locate the EOCD record by scanning backward from the end.
///
/// A candidate only counts if its comment length reaches end of file
/// exactly, so a stray signature inside the comment is skipped.
fn find_eocd(data: &[u8]) -> Result<usize> {
    let size = EndOfCentralDirectory::SIZE;
    if data.len() < size {
        return Err(Error::InvalidZipArchive("file shorter than end of central directory"));
    }
    let last = data.len() - size;
    let first = data.len().saturating_sub(size + MAX_COMMENT_SIZE);
    let signature = EndOfCentralDirectory::SIGNATURE.to_le_bytes();

    for i in (first..=last).rev() {
        if data[i..i + 4] != signature {
            continue;
        }
        let comment_len = u16::from_le_bytes([data[i + 20], data[i + 21]]) as usize;
        if comment_len == data.len() - i - size {
            return Ok(i);
        }
        trace!("zip: signature at {i} has comment length {comment_len}, skipping");
    }
    Err(Error::InvalidZipArchive("end of central directory not found"))
}

/// An opened archive: the parsed central directory plus the archive comment.
///
/// The handle does not borrow the archive bytes; [`ZipArchive::extract`]
/// takes them again, so the same buffer must be passed back.
#[derive(Debug, Clone)]
pub struct ZipArchive {
    entries: Vec<ZipEntry>,
    comment: Vec<u8>,
}

impl ZipArchive {
    pub fn open(data: &[u8]) -> Result<Self> {
        let eocd_pos = find_eocd(data)?;
        let eocd = EndOfCentralDirectory::read(&data[eocd_pos..])?;
        trace!("zip: {:?} at {eocd_pos}", eocd);

        if eocd.is_zip64() {
            return Err(Error::InvalidZipArchive("zip64 archives are not supported"));
        }
        if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
            return Err(Error::InvalidZipArchive("multi-disk archives are not supported"));
        }
        if eocd.disk_entries != eocd.total_entries {
            return Err(Error::InvalidZipArchive("entry counts disagree"));
        }

        let cd_start = eocd.cd_offset as usize;
        let cd_end = cd_start + eocd.cd_size as usize;
        if cd_end > eocd_pos {
            return Err(Error::InvalidZipArchive("central directory out of bounds"));
        }

        let total = eocd.total_entries as usize;
        let mut entries = Vec::new();
        entries.try_reserve(total)?;

        // Central directory cursor; each local header is read through a
        // separate scratch cursor so this one never has to be restored.
        let mut cd = Cursor::new(data);
        cd.set_position(cd_start as u64);

        for index in 0..total {
            let pos = cd.position() as usize;
            if pos + CentralDirectoryHeader::SIZE > cd_end {
                debug!("zip: central directory ends after {index} of {total} records");
                return Err(Error::InvalidZipArchive("fewer central directory records than declared"));
            }
            let header = CentralDirectoryHeader::read(&mut cd)?;
            if pos + header.record_len() > cd_end {
                return Err(Error::InvalidZipArchive("central directory record overruns directory"));
            }

            let mut name = vec![0u8; header.name_len as usize];
            cd.read_exact(&mut name)?;
            let skip = header.extra_len as u64 + header.comment_len as u64;
            cd.set_position(cd.position() + skip);

            let data_offset = Self::data_offset(data, header.local_header_offset as usize)?;
            let entry = ZipEntry {
                name:                String::from_utf8_lossy(&name).into_owned(),
                method:              CompressionMethod::from_u16(header.method),
                flags:               header.flags,
                compressed_size:     header.compressed_size as u64,
                uncompressed_size:   header.uncompressed_size as u64,
                crc32:               header.crc32,
                local_header_offset: header.local_header_offset as u64,
                data_offset,
                last_mod_time:       header.last_mod_time,
                last_mod_date:       header.last_mod_date,
            };
            trace!("zip: entry {:?} {:?} at {}", entry.name, entry.method, entry.data_offset);
            entries.push(entry);
        }

        if cd.position() as usize != cd_end {
            debug!("zip: records span {} bytes, directory declares {}", cd.position() as usize - cd_start, eocd.cd_size);
            return Err(Error::InvalidZipArchive("central directory size mismatch"));
        }

        let comment = data[eocd_pos + EndOfCentralDirectory::SIZE..].to_vec();
        debug!("zip: opened archive with {} entries", entries.len());
        Ok(Self { entries, comment })
    }

    /// Payload start for the member whose local header sits at `offset`.
    fn data_offset(data: &[u8], offset: usize) -> Result<u64> {
        if offset + LocalFileHeader::SIZE > data.len() {
            return Err(Error::InvalidZipArchive("local file header out of bounds"));
        }
        let mut scratch = Cursor::new(&data[offset..]);
        let lfh = LocalFileHeader::read(&mut scratch)?;
        Ok((offset + LocalFileHeader::SIZE + lfh.name_len as usize + lfh.extra_len as usize) as u64)
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Decompress `entry` out of `data`, the buffer the archive was opened from.
    ///
    /// A deflate-like payload that would decode past the declared size is
    /// rejected with [`Error::InvalidData`] before the excess is produced.
    pub fn extract(&self, entry: &ZipEntry, data: &[u8]) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            return Err(Error::InvalidZipArchive("encrypted entries are not supported"));
        }

        let start = entry.data_offset as usize;
        let end = start
            .checked_add(entry.compressed_size as usize)
            .filter(|&end| end <= data.len())
            .ok_or(Error::InvalidData)?;
        let payload = &data[start..end];

        let out = match entry.method {
            CompressionMethod::Stored => {
                if entry.compressed_size != entry.uncompressed_size {
                    return Err(Error::ZipUncompressSizeMismatch {
                        expected: entry.uncompressed_size,
                        actual:   entry.compressed_size,
                    });
                }
                let mut out = alloc_output(payload.len())?;
                out.extend_from_slice(payload);
                out
            }
            CompressionMethod::Deflate => {
                let limit = usize::try_from(entry.uncompressed_size).unwrap_or(usize::MAX);
                let out = deflate::decode_limited(payload, limit)?;
                if out.len() as u64 != entry.uncompressed_size {
                    return Err(Error::ZipUncompressSizeMismatch {
                        expected: entry.uncompressed_size,
                        actual:   out.len() as u64,
                    });
                }
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(Error::UnsupportedCompressionMethod(method));
            }
        };

        let actual = crc32(&out);
        if actual != entry.crc32 {
            debug!("zip: CRC mismatch on {:?}", entry.name);
            return Err(Error::ChecksumMismatch { expected: entry.crc32, actual });
        }
        Ok(out)
    }
}
