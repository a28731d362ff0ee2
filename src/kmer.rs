//! Lazy enumeration of `(position, encoded k-mer)` pairs over a sequence.

use std::marker::PhantomData;

use crate::alphabet::Alphabet;
use crate::sequence::Sequence;

/// A single-pass, finite, non-restartable iterator over the valid k-mer
/// windows of a sequence.
///
/// A window is valid if none of its `k` symbols are ambiguous under `A`.
/// After an ambiguous symbol, the iterator resynchronizes: it resumes
/// emitting once it has accumulated `k` consecutive unambiguous symbols.
pub struct KmerIterator<'s, A: Alphabet> {
    sequence: &'s Sequence,
    k: usize,
    /// Index of the next symbol to fold into the rolling window.
    next_symbol: usize,
    /// Rolling encoded window, valid once `valid_run >= k`.
    window: u32,
    /// Count of consecutive unambiguous symbols folded so far (caps at `k`).
    valid_run: usize,
    mask: u32,
    _alphabet: PhantomData<A>,
}

impl<'s, A: Alphabet> KmerIterator<'s, A> {
    pub fn new(sequence: &'s Sequence, k: usize) -> Self {
        debug_assert!(k > 0 && k <= A::max_kmer_length());
        let bits = A::bits_per_symbol();
        let mask = if (bits as usize) * k >= 32 {
            u32::MAX
        } else {
            (1u32 << (bits * k as u32)) - 1
        };
        Self {
            sequence,
            k,
            next_symbol: 0,
            window: 0,
            valid_run: 0,
            mask,
            _alphabet: PhantomData,
        }
    }
}

impl<'s, A: Alphabet> Iterator for KmerIterator<'s, A> {
    type Item = (usize, u32);

    fn next(&mut self) -> Option<(usize, u32)> {
        let bits = A::bits_per_symbol();
        while self.next_symbol < self.sequence.len() {
            let symbol = self.sequence[self.next_symbol];
            self.next_symbol += 1;

            if A::is_ambiguous(symbol) {
                self.window = 0;
                self.valid_run = 0;
                continue;
            }

            let code = A::encode(symbol).expect("unambiguous symbol must encode");
            self.window = ((self.window << bits) | code) & self.mask;
            self.valid_run = (self.valid_run + 1).min(self.k);

            if self.valid_run >= self.k {
                let pos = self.next_symbol - self.k;
                return Some((pos, self.window));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Dna;

    fn kmers(seq: &str, k: usize) -> Vec<(usize, u32)> {
        let seq = Sequence::new("s", seq.as_bytes().to_vec());
        KmerIterator::<Dna>::new(&seq, k).collect()
    }

    #[test]
    fn enumerates_all_windows_when_unambiguous() {
        let got = kmers("ACGTACGT", 3);
        assert_eq!(got.len(), 6);
        assert_eq!(got[0].0, 0);
        assert_eq!(got[5].0, 5);
    }

    #[test]
    fn skips_windows_touching_ambiguous_symbols() {
        let got = kmers("ACGNACGT", 3);
        // Windows at positions 0..=3 all touch the N at index 3; 4,5 are clean.
        let positions: Vec<usize> = got.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![4, 5]);
    }

    #[test]
    fn resyncs_exactly_after_k_valid_symbols() {
        let got = kmers("NNACGT", 3);
        let positions: Vec<usize> = got.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![2, 3]);
    }

    #[test]
    fn identical_windows_yield_identical_encodings() {
        let got = kmers("ACGTACGT", 4);
        assert_eq!(got[0].1, got[4].1);
    }

    #[test]
    fn empty_sequence_yields_nothing() {
        assert!(kmers("", 3).is_empty());
    }

    #[test]
    fn sequence_shorter_than_k_yields_nothing() {
        assert!(kmers("AC", 3).is_empty());
    }
}
