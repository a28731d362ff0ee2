//! Seeds, HSPs, and the diagonal-run tracker that turns raw k-mer hits
//! into maximal ungapped anchors.

use crate::cigar::Cigar;

/// A k-mer hit or a merged run of hits along a single diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub qpos: usize,
    pub tpos: usize,
    pub length: usize,
}

/// A high-scoring segment pair: an (ungapped-or-lightly-gapped) alignment
/// between `query[q_start..=q_end]` and `target[t_start..=t_end]`.
#[derive(Debug, Clone)]
pub struct Hsp {
    pub q_start: usize,
    pub q_end: usize,
    pub t_start: usize,
    pub t_end: usize,
    pub cigar: Cigar,
    /// Sum of the left/right X-drop extension scores and the middle run's
    /// match/mismatch score.
    pub score: i32,
}

impl Hsp {
    pub fn new(
        q_start: usize,
        q_end: usize,
        t_start: usize,
        t_end: usize,
        cigar: Cigar,
        score: i32,
    ) -> Self {
        debug_assert!(q_end >= q_start && t_end >= t_start);
        Self {
            q_start,
            q_end,
            t_start,
            t_end,
            cigar,
            score,
        }
    }

    pub fn length(&self) -> usize {
        (self.q_end - self.q_start).max(self.t_end - self.t_start) + 1
    }

    pub fn is_overlapping(&self, other: &Hsp) -> bool {
        (self.q_start <= other.q_end && other.q_start <= self.q_end)
            || (self.t_start <= other.t_end && other.t_start <= self.t_end)
    }

    /// Euclidean distance between the nearer corners of two non-overlapping
    /// HSPs.
    pub fn distance_to(&self, other: &Hsp) -> f64 {
        let dx = if self.q_start > other.q_end {
            self.q_start - other.q_end
        } else if other.q_start > self.q_end {
            other.q_start - self.q_end
        } else {
            0
        };
        let dy = if self.t_start > other.t_end {
            self.t_start - other.t_end
        } else if other.t_start > self.t_end {
            other.t_start - self.t_end
        } else {
            0
        };
        ((dx * dx + dy * dy) as f64).sqrt()
    }

    /// True iff `self` strictly precedes `other` on both axes: `qStart`
    /// strictly less *and* `tStart` strictly less. This is intentionally
    /// not a full lexicographic order, so two HSPs with equal `q_start`
    /// but differing `t_start` compare as neither-less-than-the-other.
    pub fn chain_precedes(&self, other: &Hsp) -> bool {
        self.q_start < other.q_start && self.t_start < other.t_start
    }
}

/// Collects `(qpos, tpos, length)` seed entries, merging any that land on
/// the same diagonal (`qpos - tpos` constant) and overlap or abut.
#[derive(Debug, Default)]
pub struct HitTracker {
    /// Per-diagonal, a sorted list of disjoint, non-abutting `[start, end]`
    /// query-position intervals (end inclusive).
    diagonals: std::collections::HashMap<i64, Vec<(usize, usize)>>,
}

impl HitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.diagonals.clear();
    }

    pub fn add_hit(&mut self, qpos: usize, tpos: usize, length: usize) {
        let diagonal = qpos as i64 - tpos as i64;
        let start = qpos;
        let end = qpos + length - 1;

        let intervals = self.diagonals.entry(diagonal).or_default();

        // Find where this interval would merge; intervals that overlap or
        // abut (gap of zero between end+1 and next start) are coalesced.
        let mut merged_start = start;
        let mut merged_end = end;
        let mut i = 0;
        while i < intervals.len() {
            let (s, e) = intervals[i];
            let abuts_or_overlaps =
                s <= merged_end.saturating_add(1) && merged_start <= e.saturating_add(1);
            if abuts_or_overlaps {
                merged_start = merged_start.min(s);
                merged_end = merged_end.max(e);
                intervals.remove(i);
            } else {
                i += 1;
            }
        }
        let pos = intervals
            .binary_search_by_key(&merged_start, |&(s, _)| s)
            .unwrap_or_else(|p| p);
        intervals.insert(pos, (merged_start, merged_end));
    }

    /// All merged seeds, sorted by `qpos` ascending, ties broken by `tpos`.
    pub fn seeds(&self) -> Vec<Seed> {
        let mut out = Vec::new();
        for (&diagonal, intervals) in &self.diagonals {
            for &(start, end) in intervals {
                let tpos = (start as i64 - diagonal) as usize;
                out.push(Seed {
                    qpos: start,
                    tpos,
                    length: end - start + 1,
                });
            }
        }
        out.sort_by(|a, b| a.qpos.cmp(&b.qpos).then(a.tpos.cmp(&b.tpos)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_kmer_hits_on_same_diagonal_merge() {
        let mut tracker = HitTracker::new();
        tracker.add_hit(0, 0, 8);
        tracker.add_hit(1, 1, 8);
        tracker.add_hit(2, 2, 8);
        let seeds = tracker.seeds();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0], Seed { qpos: 0, tpos: 0, length: 10 });
    }

    #[test]
    fn different_diagonals_stay_separate() {
        let mut tracker = HitTracker::new();
        tracker.add_hit(0, 0, 8);
        tracker.add_hit(20, 0, 8);
        let seeds = tracker.seeds();
        assert_eq!(seeds.len(), 2);
    }

    #[test]
    fn seeds_sorted_by_qpos_then_tpos() {
        let mut tracker = HitTracker::new();
        tracker.add_hit(10, 0, 4);
        tracker.add_hit(0, 5, 4);
        let seeds = tracker.seeds();
        assert_eq!(seeds[0].qpos, 0);
        assert_eq!(seeds[1].qpos, 10);
    }

    #[test]
    fn hsp_overlap_and_distance() {
        let a = Hsp::new(0, 10, 0, 10, Cigar::new(), 0);
        let b = Hsp::new(5, 15, 5, 15, Cigar::new(), 0);
        assert!(a.is_overlapping(&b));

        let c = Hsp::new(20, 30, 20, 30, Cigar::new(), 0);
        assert!(!a.is_overlapping(&c));
        assert!((a.distance_to(&c) - ((10.0f64 * 10.0 + 10.0 * 10.0).sqrt())).abs() < 1e-9);
    }

    #[test]
    fn chain_precedes_is_the_and_comparator_not_lexicographic() {
        let a = Hsp::new(5, 10, 10, 15, Cigar::new(), 0);
        let b = Hsp::new(5, 10, 2, 8, Cigar::new(), 0);
        // Equal q_start, differing t_start: neither should strictly precede.
        assert!(!a.chain_precedes(&b));
        assert!(!b.chain_precedes(&a));
    }
}
