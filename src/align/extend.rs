//! X-drop gapped extension from a seed anchor, in either direction.
//!
//! Ported from the semi-gapped row-at-a-time recurrence used by BLAST's
//! `SemiGappedAlign`: one DP row is kept at a time, each cell carrying both
//! its best score and the best score ending in an open column-gap at that
//! cell, and cells falling more than `x_drop` below the running best are
//! pruned from future consideration.

use std::marker::PhantomData;

use crate::alphabet::Alphabet;
use crate::align::{Direction, NEG_INF};
use crate::cigar::{Cigar, CigarOp};
use crate::sequence::Sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendParams {
    pub x_drop: i32,
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_open_score: i32,
    pub gap_extend_score: i32,
}

impl Default for ExtendParams {
    fn default() -> Self {
        Self {
            x_drop: 32,
            match_score: 2,
            mismatch_score: -4,
            gap_open_score: -20,
            gap_extend_score: -2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtendResult {
    pub score: i32,
    pub best_a: usize,
    pub best_b: usize,
    pub cigar: Cigar,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    score: i32,
    score_gap: i32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            score: NEG_INF,
            score_gap: NEG_INF,
        }
    }
}

/// Owns its scratch row and traceback matrix, grown on demand and reused
/// across calls within one search engine.
pub struct ExtendAligner<A: Alphabet> {
    params: ExtendParams,
    row: Vec<Cell>,
    operations: Vec<CigarOp>,
    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> ExtendAligner<A> {
    pub fn new(params: ExtendParams) -> Self {
        Self {
            params,
            row: Vec::new(),
            operations: Vec::new(),
            _alphabet: PhantomData,
        }
    }

    fn ensure_capacity(&mut self, width: usize, height: usize) {
        if self.row.len() < width {
            self.row = vec![Cell::default(); width + width / 2 + 1];
        }
        let cells = width * height;
        if self.operations.len() < cells {
            self.operations = vec![CigarOp::default(); cells + cells / 2 + 1];
        }
    }

    /// Extends from one cell beyond `(start_a, start_b)` in `dir`, scoring
    /// 0 at the anchor itself. Returns the best score reached and, if
    /// `want_cigar`, the CIGAR from the anchor to the best position (in
    /// sequence order regardless of `dir`).
    pub fn extend(
        &mut self,
        a: &Sequence,
        b: &Sequence,
        dir: Direction,
        start_a: usize,
        start_b: usize,
        want_cigar: bool,
    ) -> ExtendResult {
        let (width, height) = match dir {
            Direction::Forward => (a.len() - start_a + 1, b.len() - start_b + 1),
            Direction::Backward => (start_a + 1, start_b + 1),
        };

        self.ensure_capacity(width, height);

        let ap = &self.params;

        let mut best_a = start_a;
        let mut best_b = start_b;
        let mut best_score = 0i32;
        let mut best_x = 0usize;
        let mut best_y = 0usize;

        self.row[0] = Cell {
            score: 0,
            score_gap: ap.gap_open_score + ap.gap_extend_score,
        };

        let mut x = 1usize;
        while x < width {
            let score = ap.gap_open_score + x as i32 * ap.gap_extend_score;
            if score < -ap.x_drop {
                break;
            }
            self.operations[x] = CigarOp::Insertion;
            self.row[x] = Cell {
                score,
                score_gap: NEG_INF,
            };
            x += 1;
        }
        let mut row_size = x;
        let mut first_x = 0usize;

        'rows: for y in 1..height {
            let mut row_gap = NEG_INF;
            let mut diag_score = NEG_INF;
            let mut last_x = first_x;

            for x in first_x..row_size {
                let col_gap = self.row[x].score_gap;

                let mut a_idx = 0usize;
                let mut b_idx = 0usize;
                let mut is_match = false;
                let mut score = NEG_INF;

                if x > 0 {
                    match dir {
                        Direction::Forward => {
                            a_idx = start_a + x - 1;
                            b_idx = start_b + y - 1;
                        }
                        Direction::Backward => {
                            a_idx = start_a - x;
                            b_idx = start_b - y;
                        }
                    }
                    is_match = A::matches(a[a_idx], b[b_idx]);
                    score = diag_score
                        + if is_match {
                            ap.match_score
                        } else {
                            ap.mismatch_score
                        };
                }

                if score < row_gap {
                    score = row_gap;
                }
                if score < col_gap {
                    score = col_gap;
                }

                diag_score = self.row[x].score;

                if best_score - score > ap.x_drop {
                    self.row[x].score = NEG_INF;
                    if x == first_x {
                        first_x += 1;
                    }
                } else {
                    last_x = x;

                    if score > best_score {
                        best_score = score;
                        best_a = a_idx;
                        best_b = b_idx;
                        best_x = x;
                        best_y = y;
                    }

                    let op = if score == row_gap {
                        CigarOp::Insertion
                    } else if score == col_gap {
                        CigarOp::Deletion
                    } else if is_match {
                        CigarOp::Match
                    } else {
                        CigarOp::Mismatch
                    };
                    self.operations[y * width + x] = op;

                    self.row[x].score = score;
                    self.row[x].score_gap = (score + ap.gap_open_score + ap.gap_extend_score)
                        .max(col_gap + ap.gap_extend_score);
                    row_gap = (score + ap.gap_open_score + ap.gap_extend_score)
                        .max(row_gap + ap.gap_extend_score);
                }
            }

            if first_x == row_size {
                break 'rows;
            }

            if last_x < row_size - 1 {
                row_size = last_x + 1;
            } else {
                while row_gap >= best_score - ap.x_drop && row_size < width {
                    self.row[row_size] = Cell {
                        score: row_gap,
                        score_gap: row_gap + ap.gap_open_score + ap.gap_extend_score,
                    };
                    self.operations[y * width + row_size] = CigarOp::Insertion;
                    row_gap += ap.gap_extend_score;
                    row_size += 1;
                }
            }

            if row_size < width {
                self.row[row_size] = Cell::default();
                row_size += 1;
            }
        }

        let mut cigar = Cigar::new();
        if want_cigar {
            let (mut bx, mut by) = (best_x, best_y);
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

        ExtendResult {
            score: best_score,
            best_a,
            best_b,
            cigar,
        }
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
    fn empty_extension_scores_zero() {
        let (a, b) = seqs("ACGT", "ACGT");
        let mut al = ExtendAligner::<Dna>::new(ExtendParams::default());
        let r = al.extend(&a, &b, Direction::Forward, 4, 4, true);
        assert_eq!(r.score, 0);
        assert!(r.cigar.is_empty());
    }

    #[test]
    fn forward_extension_through_identical_tail() {
        let (a, b) = seqs("ACGTACGT", "ACGTACGT");
        let mut al = ExtendAligner::<Dna>::new(ExtendParams::default());
        let r = al.extend(&a, &b, Direction::Forward, 0, 0, true);
        assert_eq!(r.score, 2 * 8);
        assert_eq!(r.cigar.to_string(), "8M");
        assert_eq!(r.best_a, 7);
        assert_eq!(r.best_b, 7);
    }

    #[test]
    fn backward_extension_through_identical_head() {
        let (a, b) = seqs("ACGTACGT", "ACGTACGT");
        let mut al = ExtendAligner::<Dna>::new(ExtendParams::default());
        let r = al.extend(&a, &b, Direction::Backward, 7, 7, true);
        assert_eq!(r.score, 2 * 7);
        assert_eq!(r.cigar.to_string(), "7M");
    }

    #[test]
    fn raising_xdrop_never_decreases_best_score() {
        let (a, b) = seqs("ACGTACGTTTTTACGTACGT", "ACGTACGTACGTACGTACGT");
        let mut low = ExtendAligner::<Dna>::new(ExtendParams {
            x_drop: 4,
            ..Default::default()
        });
        let mut high = ExtendAligner::<Dna>::new(ExtendParams {
            x_drop: 1000,
            ..Default::default()
        });
        let r_low = low.extend(&a, &b, Direction::Forward, 0, 0, false);
        let r_high = high.extend(&a, &b, Direction::Forward, 0, 0, false);
        assert!(r_high.score >= r_low.score);
    }

    #[test]
    fn cigar_consumes_expected_symbol_counts() {
        let (a, b) = seqs("ACGTACGTACGT", "ACGTTCGTACGT");
        let mut al = ExtendAligner::<Dna>::new(ExtendParams::default());
        let r = al.extend(&a, &b, Direction::Forward, 0, 0, true);
        assert_eq!(r.cigar.query_len(), r.best_a + 1);
        assert_eq!(r.cigar.target_len(), r.best_b + 1);
    }
}
