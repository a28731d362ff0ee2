//! Banded affine-gap global alignment between two anchored endpoints, with
//! terminal gaps (those touching a sequence terminus) costed separately
//! from interior gaps so that unaligned flanks stay cheap while internal
//! indels are penalized heavily.

use std::marker::PhantomData;

use crate::alphabet::Alphabet;
use crate::align::{Direction, NEG_INF};
use crate::cigar::{Cigar, CigarOp};
use crate::sequence::Sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandedParams {
    pub bandwidth: usize,
    pub match_score: i32,
    pub mismatch_score: i32,
    pub interior_gap_open: i32,
    pub interior_gap_extend: i32,
    pub terminal_gap_open: i32,
    pub terminal_gap_extend: i32,
}

impl Default for BandedParams {
    fn default() -> Self {
        Self {
            bandwidth: 16,
            match_score: 2,
            mismatch_score: -4,
            interior_gap_open: -20,
            interior_gap_extend: -2,
            terminal_gap_open: -2,
            terminal_gap_extend: -1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BandedResult {
    pub score: i32,
    pub cigar: Cigar,
}

/// Tracks the best score of a gap (horizontal or vertical) ending at a
/// cell, remembering whether that gap is currently a cheap terminal gap or
/// an expensive interior one.
#[derive(Debug, Clone, Copy)]
struct Gap {
    score: i32,
    is_terminal: bool,
    terminal_gap_score: i32,
    terminal_gap_extend: i32,
    interior_gap_score: i32,
    interior_gap_extend: i32,
}

impl Gap {
    fn new(p: &BandedParams) -> Self {
        Self {
            score: NEG_INF,
            is_terminal: false,
            terminal_gap_score: p.terminal_gap_open + p.terminal_gap_extend,
            terminal_gap_extend: p.terminal_gap_extend,
            interior_gap_score: p.interior_gap_open + p.interior_gap_extend,
            interior_gap_extend: p.interior_gap_extend,
        }
    }

    fn open_or_extend(&mut self, score: i32, terminal: bool, length: usize) {
        let new_gap_score = score
            + length as i32 * if terminal { self.terminal_gap_score } else { self.interior_gap_score };
        // Always extends by one step first, using the gap's *current*
        // terminality, before possibly being superseded by a fresh open.
        self.extend(1);
        if new_gap_score > self.score {
            self.score = new_gap_score;
            self.is_terminal = terminal;
        }
    }

    fn extend(&mut self, length: usize) {
        self.score += length as i32
            * if self.is_terminal {
                self.terminal_gap_extend
            } else {
                self.interior_gap_extend
            };
    }

    fn reset(&mut self) {
        self.score = NEG_INF;
        self.is_terminal = false;
    }
}

/// Owns its score row, vertical-gap-state-per-column, and traceback
/// matrix, grown on demand and reused across calls within one search
/// engine.
pub struct BandedAligner<A: Alphabet> {
    params: BandedParams,
    scores: Vec<i32>,
    vertical_gaps: Vec<Gap>,
    operations: Vec<CigarOp>,
    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> BandedAligner<A> {
    pub fn new(params: BandedParams) -> Self {
        Self {
            params,
            scores: Vec::new(),
            vertical_gaps: Vec::new(),
            operations: Vec::new(),
            _alphabet: PhantomData,
        }
    }

    fn ensure_capacity(&mut self, width: usize, height: usize) {
        if self.scores.len() < width {
            self.scores = vec![NEG_INF; width + width / 2 + 1];
        }
        if self.vertical_gaps.len() < width {
            self.vertical_gaps = vec![Gap::new(&self.params); width + width / 2 + 1];
        }
        let cells = width * height;
        if self.operations.len() < cells {
            self.operations = vec![CigarOp::default(); cells + cells / 2 + 1];
        }
    }

    /// Aligns `A[start_a..end_a]` against `B[start_b..end_b]` (direction-
    /// aware; `end_a`/`end_b` default to the respective sequence's far
    /// endpoint in `dir`) within a band of half-width `bandwidth` around
    /// the submatrix's main diagonal.
    #[allow(clippy::too_many_arguments)]
    pub fn align(
        &mut self,
        a: &Sequence,
        b: &Sequence,
        dir: Direction,
        start_a: usize,
        start_b: usize,
        end_a: Option<usize>,
        end_b: Option<usize>,
        want_cigar: bool,
    ) -> BandedResult {
        let len_a = a.len();
        let len_b = b.len();

        let end_a = end_a.unwrap_or(match dir {
            Direction::Forward => len_a,
            Direction::Backward => 0,
        });
        let end_b = end_b.unwrap_or(match dir {
            Direction::Forward => len_b,
            Direction::Backward => 0,
        });

        let width = end_a.abs_diff(start_a) + 1;
        let height = end_b.abs_diff(start_b) + 1;

        self.ensure_capacity(width, height);
        for g in &mut self.vertical_gaps[..width] {
            g.reset();
        }

        let bw = self.params.bandwidth;
        let mp = self.params;

        let from_beginning_a = start_a == 0 || start_a == len_a;
        let from_beginning_b = start_b == 0 || start_b == len_b;
        let from_end_a = end_a == 0 || end_a == len_a;
        let from_end_b = end_b == 0 || end_b == len_b;

        self.scores[0] = 0;
        self.vertical_gaps[0].open_or_extend(self.scores[0], from_beginning_b, 1);

        let mut horizontal_gap = Gap::new(&mp);

        let mut x = 1usize;
        while x < width {
            if x > bw && height > 1 {
                break;
            }
            horizontal_gap.open_or_extend(self.scores[x - 1], from_beginning_a, 1);
            self.scores[x] = horizontal_gap.score;
            self.operations[x] = CigarOp::Insertion;
            x += 1;
        }
        if x < width {
            self.scores[x] = NEG_INF;
            self.vertical_gaps[x].reset();
        }

        let mut center = 1usize;
        let mut y = 1usize;
        while y < height {
            let left_bound = (if center > bw { center - bw } else { 0 }).min(width - 1);
            let right_bound = (center + bw).min(width - 1);

            let mut diag_score = NEG_INF;
            if left_bound > 0 {
                diag_score = self.scores[left_bound - 1];
                self.scores[left_bound - 1] = NEG_INF;
                self.vertical_gaps[left_bound - 1].reset();
            }

            horizontal_gap.reset();
            x = left_bound;
            while x <= right_bound {
                let mut a_idx = 0usize;
                let mut b_idx = 0usize;
                let mut is_match = false;
                let mut score = NEG_INF;

                if x > 0 {
                    (a_idx, b_idx) = match dir {
                        Direction::Forward => (start_a + x - 1, start_b + y - 1),
                        Direction::Backward => (start_a - x, start_b - y),
                    };
                    is_match = A::matches(a[a_idx], b[b_idx]);
                    score = diag_score + if is_match { mp.match_score } else { mp.mismatch_score };
                }

                if score < horizontal_gap.score {
                    score = horizontal_gap.score;
                }
                if score < self.vertical_gaps[x].score {
                    score = self.vertical_gaps[x].score;
                }

                diag_score = self.scores[x];
                self.scores[x] = score;

                let op = if score == horizontal_gap.score {
                    CigarOp::Insertion
                } else if score == self.vertical_gaps[x].score {
                    CigarOp::Deletion
                } else if is_match {
                    CigarOp::Match
                } else {
                    CigarOp::Mismatch
                };
                self.operations[y * width + x] = op;

                let is_terminal_a = (x == 0 || x == width - 1) && from_end_a;
                let is_terminal_b = (y == 0 || y == height - 1) && from_end_b;

                horizontal_gap.open_or_extend(score, is_terminal_b, 1);
                self.vertical_gaps[x].open_or_extend(score, is_terminal_a, 1);

                x += 1;
            }

            if right_bound + 1 < width {
                self.scores[right_bound + 1] = NEG_INF;
                self.vertical_gaps[right_bound + 1].reset();
            }

            if right_bound == left_bound {
                break;
            }

            center += 1;
            y += 1;
        }

        let mut score = self.scores[x - 1];
        if x == width {
            let vg = &mut self.vertical_gaps[x - 1];
            vg.extend(height - y);
            score = vg.score;
        }

        let mut cigar = Cigar::new();
        if want_cigar {
            let (mut bx, mut by) = (width - 1, height - 1);
            while bx != 0 || by != 0 {
                let op = self.operations[by * width + bx];
                cigar.push(op);
                match op {
                    CigarOp::Insertion => bx -= 1,
                    CigarOp::Deletion => by -= 1,
                    CigarOp::Match | CigarOp::Mismatch => {
                        bx -= 1;
                        by -= 1;
                    }
                }
            }
            if dir == Direction::Forward {
                cigar.reverse();
            }
        }

        BandedResult { score, cigar }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Dna;

    fn seqs(a: &str, b: &str) -> (Sequence, Sequence) {
        (Sequence::new("a", a.as_bytes().to_vec()), Sequence::new("b", b.as_bytes().to_vec()))
    }

    #[test]
    fn identical_sequences_align_perfectly() {
        let (a, b) = seqs("ACGTACGT", "ACGTACGT");
        let mut al = BandedAligner::<Dna>::new(BandedParams::default());
        let r = al.align(&a, &b, Direction::Forward, 0, 0, None, None, true);
        assert_eq!(r.score, 2 * 8);
        assert_eq!(r.cigar.to_string(), "8M");
    }

    #[test]
    fn single_mismatch_is_scored_correctly() {
        let (a, b) = seqs("ACGTACGTACGTACGT", "ACGTACGTTCGTACGT");
        let mut al = BandedAligner::<Dna>::new(BandedParams::default());
        let r = al.align(&a, &b, Direction::Forward, 0, 0, None, None, true);
        assert_eq!(r.cigar.to_string(), "8M1X7M");
        assert_eq!(r.score, 15 * 2 - 4);
    }

    #[test]
    fn single_target_insertion_is_scored_with_terminal_aware_gap() {
        let (a, b) = seqs("ACGTACGTACGTACGT", "ACGTACGTAACGTACGT");
        let mut al = BandedAligner::<Dna>::new(BandedParams::default());
        let r = al.align(&a, &b, Direction::Forward, 0, 0, None, None, true);
        // One base inserted in target at an interior position -> one Deletion run.
        let has_one_del = r
            .cigar
            .iter()
            .filter(|e| e.op == CigarOp::Deletion)
            .count()
            == 1;
        assert!(has_one_del, "expected exactly one deletion run, got {}", r.cigar);
    }

    #[test]
    fn widening_bandwidth_never_decreases_score() {
        let (a, b) = seqs("ACGTACGTACGTACGTACGT", "ACGTTTACGTACGTACGTAC");
        let mut narrow = BandedAligner::<Dna>::new(BandedParams {
            bandwidth: 1,
            ..Default::default()
        });
        let mut wide = BandedAligner::<Dna>::new(BandedParams {
            bandwidth: 16,
            ..Default::default()
        });
        let r_narrow = narrow.align(&a, &b, Direction::Forward, 0, 0, None, None, false);
        let r_wide = wide.align(&a, &b, Direction::Forward, 0, 0, None, None, false);
        assert!(r_wide.score >= r_narrow.score);
    }

    #[test]
    fn cigar_consumes_exactly_the_aligned_spans() {
        let (a, b) = seqs("ACGTACGTACGTACGT", "ACGTACGTTCGTACGT");
        let mut al = BandedAligner::<Dna>::new(BandedParams::default());
        let r = al.align(&a, &b, Direction::Forward, 0, 0, None, None, true);
        assert_eq!(r.cigar.query_len(), a.len());
        assert_eq!(r.cigar.target_len(), b.len());
    }

    #[test]
    fn backward_direction_aligns_a_prefix() {
        let (a, b) = seqs("ACGTACGT", "ACGTACGT");
        let mut al = BandedAligner::<Dna>::new(BandedParams::default());
        let r = al.align(&a, &b, Direction::Backward, 7, 7, Some(0), Some(0), true);
        assert_eq!(r.cigar.to_string(), "8M");
    }
}
