//! Checksums used by the containers and the match finder.
//!
//! * [`crc32`]: ISO 3309 / gzip polynomial, computed with `crc32fast`.
//! * [`adler32`]: RFC 1950, bit-exact with zlib (it is a format marker).
//! * [`header_hash`]: a cheap multiply-accumulate hash for header
//!   self-checks and match-table bucketing.  Not cryptographic.

/// Compute CRC32 of a byte slice.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ── Adler32 ──────────────────────────────────────────────────────────────────

const ADLER_MOD: u32 = 65521;

/// Largest block for which the accumulators cannot overflow a u32
/// before the modulo is applied.
const ADLER_NMAX: usize = 5552;

/// Incremental Adler32 state.
#[derive(Debug, Clone, Copy)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self { a: 1, b: 0 }
    }
}

impl Adler32 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        for block in data.chunks(ADLER_NMAX) {
            for &byte in block {
                self.a += byte as u32;
                self.b += self.a;
            }
            self.a %= ADLER_MOD;
            self.b %= ADLER_MOD;
        }
    }

    pub fn finalize(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

/// Compute Adler32 of a byte slice.
pub fn adler32(data: &[u8]) -> u32 {
    let mut state = Adler32::new();
    state.update(data);
    state.finalize()
}

// ── Header hash ──────────────────────────────────────────────────────────────

const HASH_SEED: u32 = 0x811C_9DC5;
const HASH_PRIME: u32 = 0x0100_0193;

/// Multiply-accumulate hash over `data`.
#[inline]
pub fn header_hash(data: &[u8]) -> u32 {
    data.iter()
        .fold(HASH_SEED, |h, &b| (h ^ b as u32).wrapping_mul(HASH_PRIME))
}

/// Map a short prefix to a bucket in a table of `1 << bits` entries.
///
/// The multiply-accumulate result is mixed once more with a golden-ratio
/// multiply so the top `bits` bits are usable directly.
#[inline]
pub(crate) fn hash_bucket(prefix: &[u8], bits: u32) -> usize {
    (header_hash(prefix).wrapping_mul(0x9E37_79B1) >> (32 - bits)) as usize
}
