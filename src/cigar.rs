//! Ordered run-length sequence of alignment operations.

use std::collections::VecDeque;
use std::fmt;

/// One column-level alignment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum CigarOp {
    #[default]
    Match,
    Mismatch,
    /// Gap in the target (query has an extra symbol).
    Insertion,
    /// Gap in the query (target has an extra symbol).
    Deletion,
}

impl CigarOp {
    pub fn to_char(self) -> char {
        match self {
            CigarOp::Match => 'M',
            CigarOp::Mismatch => 'X',
            CigarOp::Insertion => 'I',
            CigarOp::Deletion => 'D',
        }
    }

    /// Whether this op consumes a query symbol.
    pub fn consumes_query(self) -> bool {
        !matches!(self, CigarOp::Deletion)
    }

    /// Whether this op consumes a target symbol.
    pub fn consumes_target(self) -> bool {
        !matches!(self, CigarOp::Insertion)
    }
}

/// A single run: `count` consecutive columns of the same [`CigarOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CigarEntry {
    pub op: CigarOp,
    pub count: usize,
}

/// An ordered sequence of [`CigarEntry`] runs.
///
/// Invariant: no two adjacent entries share the same op; every mutator
/// that can introduce such a pair coalesces them instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cigar {
    entries: VecDeque<CigarEntry>,
}

impl Cigar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_runs(&self) -> usize {
        self.entries.len()
    }

    pub fn front(&self) -> Option<&CigarEntry> {
        self.entries.front()
    }

    pub fn back(&self) -> Option<&CigarEntry> {
        self.entries.back()
    }

    pub fn pop_front(&mut self) -> Option<CigarEntry> {
        self.entries.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<CigarEntry> {
        self.entries.pop_back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CigarEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Appends a single column of `op`, coalescing with the trailing run if
    /// it has the same op.
    pub fn push(&mut self, op: CigarOp) {
        self.push_run(op, 1);
    }

    /// Appends `count` columns of `op`, coalescing with the trailing run.
    pub fn push_run(&mut self, op: CigarOp, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(last) = self.entries.back_mut() {
            if last.op == op {
                last.count += count;
                return;
            }
        }
        self.entries.push_back(CigarEntry { op, count });
    }

    /// Prepends `count` columns of `op`, coalescing with the leading run.
    pub fn push_front_run(&mut self, op: CigarOp, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(first) = self.entries.front_mut() {
            if first.op == op {
                first.count += count;
                return;
            }
        }
        self.entries.push_front(CigarEntry { op, count });
    }

    /// Appends `other` to the end of `self`, coalescing at the seam.
    pub fn append(&mut self, mut other: Cigar) {
        if let Some(first) = other.entries.pop_front() {
            self.push_run(first.op, first.count);
            self.entries.extend(other.entries);
        }
    }

    /// Reverses run order (used to turn a traceback-order CIGAR, built from
    /// the alignment's end back to its start, into sequence order).
    pub fn reverse(&mut self) {
        let reversed: VecDeque<CigarEntry> = self.entries.iter().rev().copied().collect();
        self.entries = reversed;
    }

    pub fn reversed(&self) -> Cigar {
        let mut c = self.clone();
        c.reverse();
        c
    }

    /// Total query symbols consumed (Match + Mismatch + Insertion).
    pub fn query_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.op.consumes_query())
            .map(|e| e.count)
            .sum()
    }

    /// Total target symbols consumed (Match + Mismatch + Deletion).
    pub fn target_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.op.consumes_target())
            .map(|e| e.count)
            .sum()
    }

    /// `(columns, matches)` excluding a single leading and single trailing
    /// terminal indel run, matching how identity is reported for a hit.
    pub fn identity_columns(&self) -> (usize, usize) {
        let mut entries: Vec<&CigarEntry> = self.entries.iter().collect();
        if let Some(first) = entries.first() {
            if matches!(first.op, CigarOp::Insertion | CigarOp::Deletion) {
                entries.remove(0);
            }
        }
        if let Some(last) = entries.last() {
            if matches!(last.op, CigarOp::Insertion | CigarOp::Deletion) {
                entries.pop();
            }
        }
        let cols: usize = entries.iter().map(|e| e.count).sum();
        let matches: usize = entries
            .iter()
            .filter(|e| e.op == CigarOp::Match)
            .map(|e| e.count)
            .sum();
        (cols, matches)
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{}{}", entry.count, entry.op.to_char())?;
        }
        Ok(())
    }
}

impl FromIterator<CigarOp> for Cigar {
    fn from_iter<I: IntoIterator<Item = CigarOp>>(iter: I) -> Self {
        let mut cigar = Cigar::new();
        for op in iter {
            cigar.push(op);
        }
        cigar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_coalesces_adjacent_runs() {
        let mut c = Cigar::new();
        c.push(CigarOp::Match);
        c.push(CigarOp::Match);
        c.push(CigarOp::Mismatch);
        c.push(CigarOp::Match);
        assert_eq!(c.to_string(), "2M1X1M");
        assert_eq!(c.num_runs(), 3);
    }

    #[test]
    fn append_coalesces_at_seam() {
        let mut a: Cigar = [CigarOp::Match, CigarOp::Match].into_iter().collect();
        let b: Cigar = [CigarOp::Match, CigarOp::Insertion].into_iter().collect();
        a.append(b);
        assert_eq!(a.to_string(), "3M1I");
    }

    #[test]
    fn append_disjoint_ops_no_coalesce() {
        let mut a: Cigar = [CigarOp::Match].into_iter().collect();
        let b: Cigar = [CigarOp::Insertion].into_iter().collect();
        a.append(b);
        assert_eq!(a.to_string(), "1M1I");
    }

    #[test]
    fn reverse_is_involutive() {
        let c: Cigar = [
            CigarOp::Match,
            CigarOp::Match,
            CigarOp::Insertion,
            CigarOp::Mismatch,
        ]
        .into_iter()
        .collect();
        let back = c.reversed().reversed();
        assert_eq!(c, back);
        assert_eq!(c.reversed().to_string(), "1X1I2M");
    }

    #[test]
    fn query_and_target_lengths() {
        // 8M1X7M: consumes 16 query, 16 target symbols.
        let c: Cigar = std::iter::repeat(CigarOp::Match)
            .take(8)
            .chain(std::iter::once(CigarOp::Mismatch))
            .chain(std::iter::repeat(CigarOp::Match).take(7))
            .collect();
        assert_eq!(c.query_len(), 16);
        assert_eq!(c.target_len(), 16);
    }

    #[test]
    fn identity_excludes_single_terminal_indel_each_end() {
        let mut c = Cigar::new();
        c.push_run(CigarOp::Insertion, 3);
        c.push_run(CigarOp::Match, 10);
        c.push_run(CigarOp::Deletion, 2);
        let (cols, matches) = c.identity_columns();
        assert_eq!(cols, 10);
        assert_eq!(matches, 10);
    }
}
