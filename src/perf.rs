//! Batch compression over independent inputs.
//!
//! Every codec call owns its match tables and output buffer, so a batch can
//! be spread across threads with no coordination.  With the `parallel`
//! feature the work runs on Rayon's global pool; without it the same calls
//! run in order.  Results are identical either way and come back in input
//! order.

use log::debug;

use crate::codec::{get_codec, CodecId, Level};
use crate::error::Result;

/// Compress each input independently with `codec`.
///
/// If any input fails, the first error (in input order) is returned.
pub fn compress_batch(inputs: &[&[u8]], codec: CodecId, level: Level) -> Result<Vec<Vec<u8>>> {
    debug!("batch: compressing {} inputs with {}", inputs.len(), codec.name());
    let c = get_codec(codec);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        inputs.par_iter().map(|data| c.compress(data, level)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(|data| c.compress(data, level)).collect()
    }
}

/// Decompress each input independently with `codec`.
pub fn decompress_batch(inputs: &[&[u8]], codec: CodecId) -> Result<Vec<Vec<u8>>> {
    debug!("batch: decompressing {} inputs with {}", inputs.len(), codec.name());
    let c = get_codec(codec);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        inputs.par_iter().map(|data| c.decompress(data)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(|data| c.decompress(data)).collect()
    }
}
