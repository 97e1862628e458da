//! # K-mer Codec
//!
//! Bijection between DNA k-mers over {A, C, T, G} and dense integers, plus
//! the sliding-window iterator used to walk a longer sequence in O(1) per
//! step.
//!
//! The encoding of `b0 b1 .. b(k-1)` is `4^k + sum(b_i * 4^(k-1-i))` with
//! bases ordered A=0, C=1, T=2, G=3. The leading `4^k` digit is a sentinel
//! that keeps leading As (digit 0) from collapsing under round-trip.

use std::collections::BTreeSet;

use crate::error::{PorepathError, Result};

/// Alphabet in encoding order.
pub const BASES: [u8; 4] = [b'A', b'C', b'T', b'G'];

/// Alphabet size.
pub const NUM_BASES: u64 = 4;

/// Index of a base in the encoding order.
///
/// # Errors
///
/// Returns `InvalidInput` for characters outside {A, C, T, G}.
pub fn base_to_index(base: u8) -> Result<usize> {
    match base {
        b'A' => Ok(0),
        b'C' => Ok(1),
        b'T' => Ok(2),
        b'G' => Ok(3),
        _ => Err(PorepathError::invalid_input(format!(
            "unknown DNA base {:?}",
            base as char
        ))),
    }
}

/// Base at an index in the encoding order. Callers guarantee `index < 4`.
fn index_to_base(index: u64) -> char {
    BASES[index as usize] as char
}

/// Number of distinct k-mers of length `k`.
pub fn num_kmers(k: usize) -> u64 {
    NUM_BASES.pow(k as u32)
}

/// Encode a k-mer, sentinel included. Codes of k-mers of length k occupy
/// the contiguous range `[4^k, 2*4^k)`.
pub fn encode_kmer(kmer: &str) -> Result<u64> {
    let mut code = 1u64;
    for &base in kmer.as_bytes() {
        code = code * NUM_BASES + base_to_index(base)? as u64;
    }
    Ok(code)
}

/// Decode a code produced by [`encode_kmer`].
pub fn decode_kmer(mut code: u64) -> String {
    let mut bases = Vec::new();
    while code > 1 {
        bases.push(index_to_base(code % NUM_BASES));
        code /= NUM_BASES;
    }
    bases.into_iter().rev().collect()
}

/// State id of a k-mer in the HMM state array. Id 0 is reserved for the
/// silent initial state, so emitting ids run over `[1, 4^k]` in
/// lexicographic (A < C < T < G) order.
pub fn kmer_state_id(kmer: &str) -> Result<usize> {
    Ok((encode_kmer(kmer)? - num_kmers(kmer.len()) + 1) as usize)
}

/// K-mer occupying a state id; inverse of [`kmer_state_id`].
pub fn state_id_kmer(id: usize, k: usize) -> String {
    decode_kmer(id as u64 - 1 + num_kmers(k))
}

/// Code range `[first, first + count)` of the k-mers reachable from `kmer`
/// by moving forward exactly `dist` bases: the suffix of length `k - dist`
/// followed by every extension of length `dist`. Extensions of a fixed
/// suffix are contiguous in code space.
fn next_kmer_code_range(kmer: &str, dist: usize) -> Result<(u64, u64)> {
    let k = kmer.len();
    let dist = dist.min(k);
    let suffix_digits = encode_kmer(&kmer[dist..])? - num_kmers(k - dist);
    let count = num_kmers(dist);
    let first = num_kmers(k) + suffix_digits * count;
    Ok((first, count))
}

/// All k-mers reachable from `kmer` by moving forward exactly `dist` bases.
/// A distance of `k` or more reaches every k-mer.
pub fn next_kmers(kmer: &str, dist: usize) -> Result<Vec<String>> {
    let (first, count) = next_kmer_code_range(kmer, dist)?;
    Ok((first..first + count).map(decode_kmer).collect())
}

/// All k-mers reachable from `kmer` by moving forward up to `dist` bases
/// (distance 0 included, so the set always contains `kmer` itself).
/// Deduplicated and ordered by ascending code, i.e. ascending state id.
pub fn kmers_within(kmer: &str, dist: usize) -> Result<Vec<String>> {
    let mut codes = BTreeSet::new();
    for d in 0..=dist.min(kmer.len()) {
        let (first, count) = next_kmer_code_range(kmer, d)?;
        codes.extend(first..first + count);
    }
    Ok(codes.into_iter().map(decode_kmer).collect())
}

/// Sliding window over a sequence, yielding the encoding of every k-mer
/// window from left to right.
///
/// Each step reuses the previous code: subtract the departing base's
/// contribution, shift, and add the entering base, keeping the sentinel in
/// place. The whole sequence is validated up front so iteration itself
/// cannot fail.
pub struct KmerWindowIter {
    digits: Vec<u64>,
    k: usize,
    pos: usize,
    code: u64,
    most_significant: u64,
    first_one: u64,
}

impl KmerWindowIter {
    /// # Errors
    ///
    /// Returns `InvalidInput` if `k` is zero, `k` exceeds the sequence
    /// length, or the sequence contains a non-ACTG character.
    pub fn new(k: usize, seq: &str) -> Result<Self> {
        if k == 0 {
            return Err(PorepathError::invalid_input("window length must be at least 1"));
        }
        if k > seq.len() {
            return Err(PorepathError::invalid_input(format!(
                "window length {} exceeds sequence length {}",
                k,
                seq.len()
            )));
        }
        let digits = seq
            .bytes()
            .map(|b| base_to_index(b).map(|i| i as u64))
            .collect::<Result<Vec<u64>>>()?;
        let first_one = num_kmers(k);
        let mut code = 1u64;
        for &d in &digits[..k] {
            code = code * NUM_BASES + d;
        }
        Ok(Self {
            digits,
            k,
            pos: 0,
            code,
            most_significant: num_kmers(k - 1),
            first_one,
        })
    }

    /// The k-mer occupying the window that the next call to `next` yields.
    pub fn current_kmer(&self) -> Option<String> {
        if self.pos + self.k <= self.digits.len() {
            Some(decode_kmer(self.code))
        } else {
            None
        }
    }
}

impl Iterator for KmerWindowIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.pos + self.k > self.digits.len() {
            return None;
        }
        let code = self.code;
        if self.pos + self.k < self.digits.len() {
            let leaving = self.digits[self.pos];
            let entering = self.digits[self.pos + self.k];
            self.code = (self.code - leaving * self.most_significant - self.first_one)
                * NUM_BASES
                + entering
                + self.first_one;
        }
        self.pos += 1;
        Some(code)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = self.digits.len() - self.k + 1;
        let remaining = total.saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for KmerWindowIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_indices_follow_encoding_order() {
        assert_eq!(base_to_index(b'A').unwrap(), 0);
        assert_eq!(base_to_index(b'C').unwrap(), 1);
        assert_eq!(base_to_index(b'T').unwrap(), 2);
        assert_eq!(base_to_index(b'G').unwrap(), 3);
        assert!(matches!(
            base_to_index(b'N'),
            Err(PorepathError::InvalidInput { .. })
        ));
    }

    #[test]
    fn encode_keeps_the_sentinel() {
        assert_eq!(encode_kmer("A").unwrap(), 4);
        assert_eq!(encode_kmer("G").unwrap(), 7);
        assert_eq!(encode_kmer("AA").unwrap(), 16);
        assert_eq!(encode_kmer("AG").unwrap(), 19);
    }

    #[test]
    fn round_trip_preserves_leading_as() {
        for kmer in ["A", "AA", "AAT", "AACG", "AAAAA", "ATCGATCG"] {
            assert_eq!(decode_kmer(encode_kmer(kmer).unwrap()), kmer);
        }
    }

    #[test]
    fn round_trip_all_kmers_up_to_k4() {
        for k in 1..=4 {
            for code in num_kmers(k)..2 * num_kmers(k) {
                let kmer = decode_kmer(code);
                assert_eq!(kmer.len(), k);
                assert_eq!(encode_kmer(&kmer).unwrap(), code);
            }
        }
    }

    #[test]
    fn state_ids_are_dense_and_lexicographic() {
        assert_eq!(kmer_state_id("A").unwrap(), 1);
        assert_eq!(kmer_state_id("C").unwrap(), 2);
        assert_eq!(kmer_state_id("T").unwrap(), 3);
        assert_eq!(kmer_state_id("G").unwrap(), 4);
        for id in 1..=num_kmers(3) as usize {
            assert_eq!(kmer_state_id(&state_id_kmer(id, 3)).unwrap(), id);
        }
    }

    #[test]
    fn next_kmers_at_exact_distance() {
        let mut found = next_kmers("AG", 1).unwrap();
        found.sort();
        assert_eq!(found, vec!["GA", "GC", "GG", "GT"]);

        assert_eq!(next_kmers("AG", 0).unwrap(), vec!["AG"]);
        assert_eq!(next_kmers("AG", 2).unwrap().len(), 16);
        // distance beyond k still reaches every k-mer exactly once
        assert_eq!(next_kmers("AG", 5).unwrap().len(), 16);
    }

    #[test]
    fn kmers_within_unions_distances() {
        let within = kmers_within("AA", 1).unwrap();
        assert_eq!(within, vec!["AA", "AC", "AT", "AG"]);

        let all = kmers_within("CT", 3).unwrap();
        assert_eq!(all.len(), 16);
        assert!(all.contains(&"CT".to_string()));
    }

    #[test]
    fn kmers_within_is_sorted_by_state_id() {
        let within = kmers_within("TGA", 2).unwrap();
        let ids: Vec<usize> = within
            .iter()
            .map(|k| kmer_state_id(k).unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn window_iterator_matches_direct_encoding() {
        let seq = "ATCGGACTTAG";
        for k in 1..=5 {
            let rolled: Vec<u64> = KmerWindowIter::new(k, seq).unwrap().collect();
            let direct: Vec<u64> = (0..=seq.len() - k)
                .map(|i| encode_kmer(&seq[i..i + k]).unwrap())
                .collect();
            assert_eq!(rolled, direct, "k = {k}");
        }
    }

    #[test]
    fn window_iterator_reports_current_kmer() {
        let mut iter = KmerWindowIter::new(3, "ACTGA").unwrap();
        assert_eq!(iter.current_kmer().as_deref(), Some("ACT"));
        iter.next();
        assert_eq!(iter.current_kmer().as_deref(), Some("CTG"));
        iter.next();
        iter.next();
        assert_eq!(iter.current_kmer(), None);
    }

    #[test]
    fn window_iterator_rejects_bad_input() {
        assert!(KmerWindowIter::new(0, "ACT").is_err());
        assert!(KmerWindowIter::new(4, "ACT").is_err());
        assert!(KmerWindowIter::new(2, "ANT").is_err());
    }

    #[test]
    fn window_iterator_len() {
        let iter = KmerWindowIter::new(3, "ACTGACT").unwrap();
        assert_eq!(iter.len(), 5);
    }
}
