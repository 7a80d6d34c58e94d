//! Greedy longest-match search over a sliding window.
//!
//! A [`MatchFinder`] owns a hash table mapping a short prefix of the input
//! (`min(min_match, 4)` bytes) to the most recent position that produced it.
//! With `max_chain > 1` it also keeps a chain ring linking every position to
//! the previous one sharing its bucket, so several origins can be probed.
//! With `max_chain <= 1` the table is flat: one candidate per bucket.
//!
//! Matches may overlap the cursor (`offset < length`); the decoders copy
//! byte by byte, which turns such a match into a run.
//!
//! The caller drives the cursor: [`MatchFinder::find`] at the current
//! position, then [`MatchFinder::insert`] (or [`MatchFinder::insert_range`])
//! for every position it steps over.  Tables live only as long as the
//! finder, i.e. for one compression call.

use crate::checksum::hash_bucket;

const NIL: usize = usize::MAX;

/// Tuning for one match search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchParams {
    /// Shortest match worth reporting.
    pub min_match:  usize,
    /// Longest match reported; longer repeats are picked up on the next step.
    pub max_match:  usize,
    /// Furthest a match may reach back.
    pub max_offset: usize,
    /// Candidates probed per position.  `<= 1` selects the flat table.
    pub max_chain:  usize,
    /// log2 of the hash table size.
    pub hash_bits:  u32,
}

/// A back-reference candidate: `offset` in `1..=max_offset`,
/// `length` in `min_match..=max_match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub offset: usize,
    pub length: usize,
}

pub struct MatchFinder<'a> {
    input:      &'a [u8],
    params:     MatchParams,
    prefix_len: usize,
    head:       Vec<usize>,
    /// Chain ring indexed by `pos & chain_mask`; empty for the flat variant.
    prev:       Vec<usize>,
    chain_mask: usize,
}

impl<'a> MatchFinder<'a> {
    pub fn new(input: &'a [u8], params: MatchParams) -> Self {
        debug_assert!(params.min_match >= 2 && params.max_match >= params.min_match);
        debug_assert!((1..=24).contains(&params.hash_bits));

        let (prev, chain_mask) = if params.max_chain > 1 {
            // The ring must outlive the window so a live link is never overwritten.
            let size = (params.max_offset + 1).next_power_of_two();
            (vec![NIL; size], size - 1)
        } else {
            (Vec::new(), 0)
        };

        Self {
            input,
            params,
            prefix_len: params.min_match.min(4),
            head: vec![NIL; 1 << params.hash_bits],
            prev,
            chain_mask,
        }
    }

    #[inline]
    fn bucket(&self, pos: usize) -> Option<usize> {
        let end = pos.checked_add(self.prefix_len)?;
        if end > self.input.len() {
            return None;
        }
        Some(hash_bucket(&self.input[pos..end], self.params.hash_bits))
    }

    /// Record `pos` as the most recent occurrence of its prefix.
    #[inline]
    pub fn insert(&mut self, pos: usize) {
        if let Some(b) = self.bucket(pos) {
            if !self.prev.is_empty() {
                self.prev[pos & self.chain_mask] = self.head[b];
            }
            self.head[b] = pos;
        }
    }

    /// Insert every position in `start..end`.
    pub fn insert_range(&mut self, start: usize, end: usize) {
        for pos in start..end {
            self.insert(pos);
        }
    }

    /// Longest match for the bytes at `pos` against earlier, already
    /// inserted positions.  Ties go to the smaller offset.
    pub fn find(&self, pos: usize) -> Option<Match> {
        let remaining = self.input.len().checked_sub(pos)?;
        if remaining < self.params.min_match {
            return None;
        }
        let max_len = remaining.min(self.params.max_match);
        let chained = !self.prev.is_empty();

        let mut cand = self.head[self.bucket(pos)?];
        let mut best: Option<Match> = None;
        let mut probes = 0;

        while cand != NIL && cand < pos && probes < self.params.max_chain.max(1) {
            let offset = pos - cand;
            if offset > self.params.max_offset {
                break;
            }

            let length = self.common_length(cand, pos, max_len);
            if length >= self.params.min_match && best.map_or(true, |b| length > b.length) {
                best = Some(Match { offset, length });
                if length == max_len {
                    break;
                }
            }

            if !chained {
                break;
            }
            // Walk strictly backwards; anything else is a stale ring slot.
            let next = self.prev[cand & self.chain_mask];
            if next == NIL || next >= cand {
                break;
            }
            cand = next;
            probes += 1;
        }

        best
    }

    #[inline]
    fn common_length(&self, cand: usize, pos: usize, max_len: usize) -> usize {
        let a = &self.input[cand..];
        let b = &self.input[pos..pos + max_len];
        b.iter().zip(a).take_while(|(x, y)| x == y).count()
    }
}
