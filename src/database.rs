//! The k-mer inverted index: two flat, pointer-free arrays built once at
//! construction and thereafter read-only and safe to share across threads.

use std::marker::PhantomData;

use crate::alphabet::Alphabet;
use crate::error::ConfigError;
use crate::kmer::KmerIterator;
use crate::sequence::Sequence;

/// Phase reported by [`Database::build_with_progress`]'s callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    StatsCollection,
    Indexing,
}

/// How often (in sequences processed) the progress callback fires, besides
/// always firing once on completion of each pass.
const PROGRESS_INTERVAL: usize = 500;

/// The read-only, thread-shareable reference index.
///
/// Maintains, per unique k-mer, the sorted list of distinct sequence ids
/// containing it (`sequence_ids_*`), and per sequence, every k-mer
/// occurrence in sequence order with duplicates (`kmers`, paired with the
/// position it occurred at; see DESIGN.md for why positions are stored
/// explicitly rather than left implicit in the slice index).
#[derive(Debug)]
pub struct Database<A: Alphabet> {
    sequences: Vec<Sequence>,
    kmer_length: usize,
    universe: u32,

    sequence_ids_offset: Vec<u32>,
    sequence_ids_count: Vec<u32>,
    sequence_ids: Vec<u32>,

    kmer_offset: Vec<u32>,
    kmer_count: Vec<u32>,
    kmers: Vec<(u32, u32)>,

    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> Database<A> {
    pub fn build(sequences: Vec<Sequence>, kmer_length: usize) -> Result<Self, ConfigError> {
        Self::build_with_progress(sequences, kmer_length, None)
    }

    pub fn build_with_progress(
        sequences: Vec<Sequence>,
        kmer_length: usize,
        mut progress: Option<&mut dyn FnMut(ProgressKind, usize, usize)>,
    ) -> Result<Self, ConfigError> {
        if kmer_length == 0 {
            return Err(ConfigError::KmerLengthZero);
        }
        if kmer_length > A::max_kmer_length() {
            return Err(ConfigError::KmerLengthTooLarge {
                kmer_length,
                max: A::max_kmer_length(),
            });
        }

        let universe: u32 = 1u32 << (A::bits_per_symbol() * kmer_length as u32);
        let n = sequences.len();

        let mut unique_count = vec![0u32; universe as usize];
        let mut last_seen = vec![u32::MAX; universe as usize];
        let mut total_kmers = 0usize;

        for (sid, seq) in sequences.iter().enumerate() {
            for (_pos, kmer) in KmerIterator::<A>::new(seq, kmer_length) {
                total_kmers += 1;
                if last_seen[kmer as usize] != sid as u32 {
                    last_seen[kmer as usize] = sid as u32;
                    unique_count[kmer as usize] += 1;
                }
            }
            if sid % PROGRESS_INTERVAL == 0 {
                if let Some(cb) = progress.as_deref_mut() {
                    cb(ProgressKind::StatsCollection, sid + 1, n);
                }
            }
        }
        if let Some(cb) = progress.as_deref_mut() {
            cb(ProgressKind::StatsCollection, n, n);
        }
        log::debug!(
            "stats pass complete: {} sequences, {} kmer occurrences, {} unique kmers",
            n,
            total_kmers,
            unique_count.iter().filter(|&&c| c > 0).count()
        );

        let mut sequence_ids_offset = vec![0u32; universe as usize];
        let mut acc = 0u32;
        for k in 0..universe as usize {
            sequence_ids_offset[k] = acc;
            acc += unique_count[k];
        }
        let total_unique = acc as usize;

        let mut sequence_ids = vec![0u32; total_unique];
        let mut fill_cursor = vec![0u32; universe as usize];
        let mut kmer_offset = vec![0u32; n];
        let mut kmer_count = vec![0u32; n];
        let mut kmers = Vec::with_capacity(total_kmers);

        last_seen.fill(u32::MAX);

        for (sid, seq) in sequences.iter().enumerate() {
            kmer_offset[sid] = kmers.len() as u32;
            let mut count_this_seq = 0u32;

            for (pos, kmer) in KmerIterator::<A>::new(seq, kmer_length) {
                kmers.push((kmer, pos as u32));
                count_this_seq += 1;

                if last_seen[kmer as usize] != sid as u32 {
                    last_seen[kmer as usize] = sid as u32;
                    let idx = sequence_ids_offset[kmer as usize] + fill_cursor[kmer as usize];
                    sequence_ids[idx as usize] = sid as u32;
                    fill_cursor[kmer as usize] += 1;
                }
            }
            kmer_count[sid] = count_this_seq;

            if sid % PROGRESS_INTERVAL == 0 {
                if let Some(cb) = progress.as_deref_mut() {
                    cb(ProgressKind::Indexing, sid + 1, n);
                }
            }
        }
        if let Some(cb) = progress.as_deref_mut() {
            cb(ProgressKind::Indexing, n, n);
        }
        log::info!(
            "database built: {} sequences, {} unique kmers of length {}",
            n,
            total_unique,
            kmer_length
        );

        Ok(Self {
            sequences,
            kmer_length,
            universe,
            sequence_ids_offset,
            sequence_ids_count: fill_cursor,
            sequence_ids,
            kmer_offset,
            kmer_count,
            kmers,
            _alphabet: PhantomData,
        })
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    /// Sequence ids (ascending) containing `kmer` at least once.
    pub fn sequence_ids_for(&self, kmer: u32) -> &[u32] {
        let off = self.sequence_ids_offset[kmer as usize] as usize;
        let cnt = self.sequence_ids_count[kmer as usize] as usize;
        &self.sequence_ids[off..off + cnt]
    }

    /// Every `(kmer, position)` occurrence in sequence `sid`, in sequence
    /// order, duplicates included.
    pub fn kmers_for(&self, sid: usize) -> &[(u32, u32)] {
        let off = self.kmer_offset[sid] as usize;
        let cnt = self.kmer_count[sid] as usize;
        &self.kmers[off..off + cnt]
    }

    /// Diagnostic dump of per-kmer occurrence counts.
    pub fn stats(&self) {
        for k in 0..self.universe {
            log::info!("{},{}", k, self.sequence_ids_count[k as usize]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Dna;

    #[test]
    fn empty_database_has_zero_counts() {
        let db = Database::<Dna>::build(Vec::new(), 4).unwrap();
        assert_eq!(db.len(), 0);
        assert!(db.sequence_ids_for(0).is_empty());
    }

    #[test]
    fn kmer_length_too_large_is_rejected() {
        let err = Database::<Dna>::build(Vec::new(), 20).unwrap_err();
        assert!(matches!(err, ConfigError::KmerLengthTooLarge { .. }));
    }

    #[test]
    fn kmer_length_zero_is_rejected() {
        let err = Database::<Dna>::build(Vec::new(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::KmerLengthZero));
    }

    #[test]
    fn roundtrip_sequence_appears_in_its_kmer_slices() {
        let seqs = vec![
            Sequence::new("s0", b"ACGTACGT".to_vec()),
            Sequence::new("s1", b"TTTTACGT".to_vec()),
        ];
        let db = Database::<Dna>::build(seqs, 4).unwrap();

        for sid in 0..db.len() {
            for &(kmer, _pos) in db.kmers_for(sid) {
                let ids = db.sequence_ids_for(kmer);
                assert!(ids.contains(&(sid as u32)), "kmer {kmer} missing sid {sid}");
                // Strictly increasing, no duplicate sequence ids per kmer.
                for w in ids.windows(2) {
                    assert!(w[0] < w[1]);
                }
            }
        }
    }

    #[test]
    fn kmer_count_matches_window_count_when_unambiguous() {
        let seqs = vec![Sequence::new("s0", b"ACGTACGTACGT".to_vec())];
        let db = Database::<Dna>::build(seqs, 4).unwrap();
        assert_eq!(db.kmers_for(0).len(), 12 - 4 + 1);
    }
}
