//! The search pipeline: candidate highscoring, per-candidate seed
//! chaining, and final stitched alignment with accept/reject accounting.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;

use crate::align::banded::{BandedAligner, BandedParams};
use crate::align::extend::{ExtendAligner, ExtendParams};
use crate::align::Direction;
use crate::alphabet::Alphabet;
use crate::cigar::{Cigar, CigarOp};
use crate::database::Database;
use crate::kmer::KmerIterator;
use crate::seed::{HitTracker, Hsp};
use crate::sequence::Sequence;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub min_identity: f64,
    pub max_accepts: usize,
    pub max_rejects: usize,
    pub max_hsp_join_distance: f64,
    pub default_min_hsp_length: usize,
    pub extend: ExtendParams,
    pub banded: BandedParams,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            min_identity: 0.75,
            max_accepts: 1,
            max_rejects: 8,
            max_hsp_join_distance: 16.0,
            default_min_hsp_length: 16,
            extend: ExtendParams::default(),
            banded: BandedParams::default(),
        }
    }
}

/// One accepted alignment between a query and a database target.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub query_id: String,
    pub target_id: String,
    pub target_index: usize,
    pub cigar: Cigar,
    pub score: i32,
    pub identity: f64,
}

/// Bounded top-K multiset keyed by hit counter, with O(log n) per-update
/// dedup via a side counter/membership array.
///
/// Mirrors `std::multiset<Candidate>` plus a `map<sid, iterator>` for
/// dedup, expressed over dense sequence ids with plain `Vec`s rather than
/// hash maps, since the counter array is reset (not reallocated) every
/// query.
struct Highscore {
    counters: Vec<u32>,
    in_set: Vec<Option<u32>>,
    /// `(counter, Reverse(sid))` so the set sorts ascending by counter and,
    /// within a counter, descending by sid. Iterating in reverse then
    /// yields counter-descending, sid-ascending order.
    set: BTreeSet<(u32, Reverse<u32>)>,
    capacity: usize,
}

impl Highscore {
    fn new(capacity: usize) -> Self {
        Self {
            counters: Vec::new(),
            in_set: Vec::new(),
            set: BTreeSet::new(),
            capacity,
        }
    }

    fn reset(&mut self, n: usize) {
        if self.counters.len() < n {
            self.counters.resize(n, 0);
            self.in_set.resize(n, None);
        }
        self.counters[..n].fill(0);
        self.in_set[..n].fill(None);
        self.set.clear();
    }

    fn increment(&mut self, sid: usize) {
        self.counters[sid] += 1;
        let counter = self.counters[sid];

        let already_tracked = self.in_set[sid].is_some();
        let has_room = self.set.len() < self.capacity;
        let beats_the_worst = self.set.iter().next().is_some_and(|&(min_counter, _)| counter > min_counter);
        if !(already_tracked || has_room || beats_the_worst) {
            return;
        }

        if let Some(old_counter) = self.in_set[sid] {
            self.set.remove(&(old_counter, Reverse(sid as u32)));
        }
        self.set.insert((counter, Reverse(sid as u32)));
        self.in_set[sid] = Some(counter);

        if self.set.len() > self.capacity {
            if let Some(&smallest) = self.set.iter().next() {
                self.set.remove(&smallest);
                self.in_set[smallest.1 .0 as usize] = None;
            }
        }
    }

    /// Candidates in counter-descending order, sequence-id ascending on ties.
    fn candidates_descending(&self) -> Vec<(u32, u32)> {
        self.set
            .iter()
            .rev()
            .map(|&(counter, Reverse(sid))| (sid, counter))
            .collect()
    }
}

/// Owns every scratch buffer used to process one query: the two DP
/// aligners, the hit tracker, the highscore set, and a target-kmer lookup
/// table. Parallel search is achieved by giving each worker thread its own
/// `SearchEngine` over a shared, read-only [`Database`].
pub struct SearchEngine<A: Alphabet> {
    params: SearchParams,
    extend: ExtendAligner<A>,
    banded: BandedAligner<A>,
    hit_tracker: HitTracker,
    highscore: Highscore,
    target_kmers: HashMap<u32, Vec<u32>>,
    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> SearchEngine<A> {
    pub fn new(params: SearchParams) -> Self {
        let capacity = params.max_accepts + params.max_rejects;
        Self {
            extend: ExtendAligner::new(params.extend),
            banded: BandedAligner::new(params.banded),
            hit_tracker: HitTracker::new(),
            highscore: Highscore::new(capacity),
            target_kmers: HashMap::new(),
            params,
            _alphabet: PhantomData,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Searches `query` against `db`, returning accepted hits in the order
    /// they were accepted (candidate counter descending).
    pub fn search(&mut self, db: &Database<A>, query: &Sequence) -> Vec<SearchHit> {
        let k = db.kmer_length();
        let min_hsp_length = self.params.default_min_hsp_length.min(query.len() / 2);

        self.highscore.reset(db.len());
        for (_qpos, kmer) in KmerIterator::<A>::new(query, k) {
            for &sid in db.sequence_ids_for(kmer) {
                self.highscore.increment(sid as usize);
            }
        }

        let candidates = self.highscore.candidates_descending();
        log::debug!(
            "query {}: {} candidates from {} kmers",
            query.identifier,
            candidates.len(),
            query.len().saturating_sub(k).saturating_add(1)
        );

        let mut hits = Vec::new();
        let mut num_accepts = 0usize;
        let mut num_rejects = 0usize;

        for (sid, counter) in candidates {
            let target = &db.sequences()[sid as usize];
            log::trace!("candidate seq {sid} counter {counter}");

            self.target_kmers.clear();
            for &(kval, pos) in db.kmers_for(sid as usize) {
                self.target_kmers.entry(kval).or_default().push(pos);
            }

            self.hit_tracker.clear();
            for (qpos, kmer) in KmerIterator::<A>::new(query, k) {
                if let Some(positions) = self.target_kmers.get(&kmer) {
                    for &tpos in positions {
                        self.hit_tracker.add_hit(qpos, tpos as usize, k);
                    }
                }
            }

            let hsps = self.build_hsps(query, target, min_hsp_length);
            let chain = Self::build_chain(hsps, self.params.max_hsp_join_distance);

            let accepted_hit = if chain.is_empty() {
                None
            } else {
                self.stitch_and_score(query, target, sid as usize, &chain)
            };

            match accepted_hit {
                Some(hit) => {
                    hits.push(hit);
                    num_accepts += 1;
                    if num_accepts >= self.params.max_accepts {
                        break;
                    }
                }
                None => {
                    num_rejects += 1;
                    if num_rejects >= self.params.max_rejects {
                        break;
                    }
                }
            }
        }

        hits
    }

    fn build_hsps(&mut self, query: &Sequence, target: &Sequence, min_hsp_length: usize) -> Vec<Hsp> {
        let mut hsps = Vec::new();
        for seed in self.hit_tracker.seeds() {
            let seed_a1 = seed.qpos;
            let seed_a2 = seed.qpos + seed.length - 1;
            let seed_b1 = seed.tpos;
            let seed_b2 = seed.tpos + seed.length - 1;

            let left = self
                .extend
                .extend(query, target, Direction::Backward, seed_a1, seed_b1, true);
            let (a1, b1) = if left.cigar.is_empty() {
                (seed_a1, seed_b1)
            } else {
                (left.best_a, left.best_b)
            };

            let right = self.extend.extend(
                query,
                target,
                Direction::Forward,
                seed_a2 + 1,
                seed_b2 + 1,
                true,
            );
            let (a2, b2) = if right.cigar.is_empty() {
                (seed_a2, seed_b2)
            } else {
                (right.best_a, right.best_b)
            };

            let mut middle = Cigar::new();
            let mut middle_score = 0i32;
            let mut s1 = seed_a1;
            let mut s2 = seed_b1;
            while s1 <= seed_a2 && s2 <= seed_b2 {
                let is_match = A::matches(query[s1], target[s2]);
                middle.push(if is_match {
                    CigarOp::Match
                } else {
                    CigarOp::Mismatch
                });
                middle_score += if is_match {
                    self.params.extend.match_score
                } else {
                    self.params.extend.mismatch_score
                };
                s1 += 1;
                s2 += 1;
            }

            let mut cigar = left.cigar;
            cigar.append(middle);
            cigar.append(right.cigar);

            let score = left.score + middle_score + right.score;
            let hsp = Hsp::new(a1, a2, b1, b2, cigar, score);
            if hsp.length() >= min_hsp_length {
                hsps.push(hsp);
            }
        }
        hsps
    }

    /// Greedily joins non-overlapping HSPs into a chain, longest first,
    /// keeping the chain sorted by `q_start` as each candidate is
    /// inserted. A candidate is admitted only if it doesn't overlap its
    /// would-be neighbors, [`Hsp::chain_precedes`] holds against both
    /// (the intentionally non-lexicographic AND-comparator), and the chain
    /// is empty or it falls within `max_join_distance` of at least one
    /// existing neighbor.
    fn build_chain(mut hsps: Vec<Hsp>, max_join_distance: f64) -> Vec<Hsp> {
        hsps.sort_by(|a, b| b.length().cmp(&a.length()));

        let mut chain: Vec<Hsp> = Vec::new();
        for hsp in hsps {
            let pos = chain.partition_point(|c| c.q_start < hsp.q_start);
            let prev = if pos > 0 { chain.get(pos - 1) } else { None };
            let next = chain.get(pos);

            if prev.is_some_and(|p| hsp.is_overlapping(p)) || next.is_some_and(|n| hsp.is_overlapping(n)) {
                continue;
            }
            if !prev.is_none_or(|p| p.chain_precedes(&hsp)) || !next.is_none_or(|n| hsp.chain_precedes(n)) {
                continue;
            }
            let joined_to_some_neighbor = prev.is_some_and(|p| hsp.distance_to(p) <= max_join_distance)
                || next.is_some_and(|n| hsp.distance_to(n) <= max_join_distance);
            if !chain.is_empty() && !joined_to_some_neighbor {
                continue;
            }

            chain.insert(pos, hsp);
        }

        chain
    }

    fn stitch_and_score(
        &mut self,
        query: &Sequence,
        target: &Sequence,
        target_index: usize,
        chain: &[Hsp],
    ) -> Option<SearchHit> {
        let mut alignment = Cigar::new();
        let mut total_score = 0i32;

        let first = &chain[0];
        let r = self.banded.align(
            query,
            target,
            Direction::Backward,
            first.q_start,
            first.t_start,
            None,
            None,
            true,
        );
        alignment.append(r.cigar);
        total_score += r.score;

        for pair in chain.windows(2) {
            let current = &pair[0];
            let next = &pair[1];
            alignment.append(current.cigar.clone());
            total_score += current.score;

            let rr = self.banded.align(
                query,
                target,
                Direction::Forward,
                current.q_end + 1,
                current.t_end + 1,
                Some(next.q_start),
                Some(next.t_start),
                true,
            );
            alignment.append(rr.cigar);
            total_score += rr.score;
        }

        let last = chain.last().expect("chain checked non-empty by caller");
        alignment.append(last.cigar.clone());
        total_score += last.score;

        let rlast = self.banded.align(
            query,
            target,
            Direction::Forward,
            last.q_end + 1,
            last.t_end + 1,
            None,
            None,
            true,
        );
        alignment.append(rlast.cigar);
        total_score += rlast.score;

        let (cols, matches) = alignment.identity_columns();
        let identity = if cols > 0 {
            matches as f64 / cols as f64
        } else {
            0.0
        };

        if identity >= self.params.min_identity {
            Some(SearchHit {
                query_id: query.identifier.clone(),
                target_id: target.identifier.clone(),
                target_index,
                cigar: alignment,
                score: total_score,
                identity,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Dna;

    fn db_of(seqs: &[(&str, &str)]) -> Database<Dna> {
        let seqs = seqs
            .iter()
            .map(|(id, s)| Sequence::new(*id, s.as_bytes().to_vec()))
            .collect();
        Database::<Dna>::build(seqs, 8).unwrap()
    }

    #[test]
    fn identical_sequence_is_a_perfect_hit() {
        let db = db_of(&[("t0", "ACGTACGTACGTACGT")]);
        let query = Sequence::new("q0", b"ACGTACGTACGTACGT".to_vec());
        let mut engine = SearchEngine::<Dna>::new(SearchParams {
            min_identity: 0.8,
            max_accepts: 1,
            ..Default::default()
        });
        let hits = engine.search(&db, &query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target_id, "t0");
        assert!((hits[0].identity - 1.0).abs() < 1e-9);
        assert_eq!(hits[0].cigar.to_string(), "16M");
    }

    #[test]
    fn single_mismatch_still_passes_threshold() {
        let db = db_of(&[("t0", "ACGTACGTTCGTACGT")]);
        let query = Sequence::new("q0", b"ACGTACGTACGTACGT".to_vec());
        let mut engine = SearchEngine::<Dna>::new(SearchParams {
            min_identity: 0.8,
            max_accepts: 1,
            ..Default::default()
        });
        let hits = engine.search(&db, &query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cigar.to_string(), "8M1X7M");
        assert!((hits[0].identity - 15.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_sequences_with_no_shared_kmer_are_rejected() {
        let db = db_of(&[("t0", "CCCCCCCC")]);
        let query = Sequence::new("q0", b"AAAAAAAA".to_vec());
        let mut engine = SearchEngine::<Dna>::new(SearchParams {
            min_identity: 0.5,
            max_accepts: 1,
            ..Default::default()
        });
        let hits = engine.search(&db, &query);
        assert!(hits.is_empty());
    }

    #[test]
    fn termination_bounds_respect_max_accepts_plus_max_rejects() {
        let mut seqs = Vec::new();
        for i in 0..100 {
            if i < 10 {
                seqs.push((format!("t{i}"), "ACGTACGTACGTACGTACGT".to_string()));
            } else {
                seqs.push((format!("t{i}"), "TTTTGGGGCCCCAAAATTTT".to_string()));
            }
        }
        let refs: Vec<(&str, &str)> = seqs.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let db = db_of(&refs);
        let query = Sequence::new("q0", b"ACGTACGTACGTACGTACGT".to_vec());
        let mut engine = SearchEngine::<Dna>::new(SearchParams {
            min_identity: 0.9,
            max_accepts: 5,
            max_rejects: 8,
            ..Default::default()
        });
        let hits = engine.search(&db, &query);
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn terminal_ambiguous_flanks_excluded_from_identity() {
        let db = db_of(&[("t0", "NNNACGTACGTACGTACGTNNN")]);
        let query = Sequence::new("q0", b"ACGTACGTACGTACGTACGT".to_vec());
        let mut engine = SearchEngine::<Dna>::new(SearchParams {
            min_identity: 0.8,
            max_accepts: 1,
            ..Default::default()
        });
        let hits = engine.search(&db, &query);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].identity >= 0.8);
    }
}
