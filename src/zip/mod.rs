//! ZIP archives over in-memory buffers.
//!
//! The record layouts (end of central directory, central directory file
//! header, local file header) are the real APPNOTE ones, so stored members
//! written by any tool open and extract.  Method 8 members carry the
//! deflate-like token stream instead of RFC 1951; members deflated by other
//! archivers fail to decode with [`Error::InvalidData`](crate::Error).
//!
//! ZIP64, multi-disk and encrypted archives are rejected.
//!
//! ```no_run
//! use lzkit::zip::{CompressionMethod, ZipArchive, ZipWriter};
//!
//! let mut w = ZipWriter::new();
//! w.add_file("hello.txt", b"hello hello hello", CompressionMethod::Deflate)?;
//! let bytes = w.finish(b"")?;
//!
//! let archive = ZipArchive::open(&bytes)?;
//! for entry in archive.entries() {
//!     let data = archive.extract(entry, &bytes)?;
//!     println!("{} ({} bytes)", entry.name, data.len());
//! }
//! # Ok::<(), lzkit::Error>(())
//! ```

pub mod reader;
pub mod structures;
pub mod writer;

pub use reader::ZipArchive;
pub use structures::{CompressionMethod, ZipEntry};
pub use writer::ZipWriter;
