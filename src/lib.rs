pub mod error;
pub mod checksum;
pub mod matchfinder;
pub mod codec;
pub mod container;
pub mod zip;
pub mod perf;

pub use error::{Error, Result};
pub use checksum::{adler32, crc32, header_hash, Adler32};
pub use matchfinder::{Match, MatchFinder, MatchParams};
pub use codec::{Codec, CodecId, Level, Token, get_codec};
pub use zip::{CompressionMethod, ZipArchive, ZipEntry, ZipWriter};
pub use perf::{compress_batch, decompress_batch};
