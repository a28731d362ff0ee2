//! The blast-like "alnout" textual alignment writer.
//!
//! Grounded in the original `PrintWholeAlignment` free function: a header
//! naming query and target, a triple-line alignment pane (query / match bar
//! / target) with 1-based position ticks at each wrapped block, and a
//! trailing `cols, ids (pct%)` summary. A single leading and trailing
//! terminal indel run is suppressed from the pane, matching the identity
//! calculation's exclusion.

use std::io::{self, Write};

use nsearch_core::{Cigar, CigarOp, SearchHit, Sequence};

const WRAP_WIDTH: usize = 60;

struct Pane {
    query_line: Vec<u8>,
    bar_line: Vec<u8>,
    target_line: Vec<u8>,
    query_start: usize,
    target_start: usize,
}

fn render_pane(query: &Sequence, target: &Sequence, cigar: &Cigar) -> Pane {
    let mut entries: Vec<_> = cigar.iter().copied().collect();
    let mut qpos = 0usize;
    let mut tpos = 0usize;

    if let Some(first) = entries.first() {
        match first.op {
            CigarOp::Insertion => {
                qpos += first.count;
                entries.remove(0);
            }
            CigarOp::Deletion => {
                tpos += first.count;
                entries.remove(0);
            }
            _ => {}
        }
    }
    if let Some(last) = entries.last() {
        if matches!(last.op, CigarOp::Insertion | CigarOp::Deletion) {
            entries.pop();
        }
    }

    let query_start = qpos;
    let target_start = tpos;
    let mut query_line = Vec::new();
    let mut bar_line = Vec::new();
    let mut target_line = Vec::new();

    for entry in &entries {
        for _ in 0..entry.count {
            match entry.op {
                CigarOp::Match | CigarOp::Mismatch => {
                    query_line.push(query[qpos]);
                    target_line.push(target[tpos]);
                    bar_line.push(if entry.op == CigarOp::Match { b'|' } else { b' ' });
                    qpos += 1;
                    tpos += 1;
                }
                CigarOp::Insertion => {
                    query_line.push(query[qpos]);
                    target_line.push(b'-');
                    bar_line.push(b' ');
                    qpos += 1;
                }
                CigarOp::Deletion => {
                    query_line.push(b'-');
                    target_line.push(target[tpos]);
                    bar_line.push(b' ');
                    tpos += 1;
                }
            }
        }
    }

    Pane {
        query_line,
        bar_line,
        target_line,
        query_start,
        target_start,
    }
}

pub(crate) fn write_hit<W: Write>(
    writer: &mut W,
    hit: &SearchHit,
    query: &Sequence,
    target: &Sequence,
) -> io::Result<()> {
    writeln!(writer, "Query  {}", hit.query_id)?;
    writeln!(writer, "Target {}", hit.target_id)?;
    writeln!(writer)?;

    let pane = render_pane(query, target, &hit.cigar);
    let mut q_cursor = pane.query_start + 1;
    let mut t_cursor = pane.target_start + 1;

    for block in 0..pane.query_line.len().div_ceil(WRAP_WIDTH) {
        let lo = block * WRAP_WIDTH;
        let hi = (lo + WRAP_WIDTH).min(pane.query_line.len());

        let q_chunk = &pane.query_line[lo..hi];
        let bar_chunk = &pane.bar_line[lo..hi];
        let t_chunk = &pane.target_line[lo..hi];
        let q_consumed = q_chunk.iter().filter(|&&c| c != b'-').count();
        let t_consumed = t_chunk.iter().filter(|&&c| c != b'-').count();

        writeln!(
            writer,
            "Query  {:>9} {} {}",
            q_cursor,
            String::from_utf8_lossy(q_chunk),
            q_cursor + q_consumed.saturating_sub(1)
        )?;
        writeln!(writer, "{:>9} {}", "", String::from_utf8_lossy(bar_chunk))?;
        writeln!(
            writer,
            "Target {:>9} {} {}",
            t_cursor,
            String::from_utf8_lossy(t_chunk),
            t_cursor + t_consumed.saturating_sub(1)
        )?;
        writeln!(writer)?;

        q_cursor += q_consumed;
        t_cursor += t_consumed;
    }

    let (cols, matches) = hit.cigar.identity_columns();
    let pct = if cols > 0 {
        100.0 * matches as f64 / cols as f64
    } else {
        0.0
    };
    writeln!(writer, "{cols} cols, {matches} ids ({pct:.1}%)")?;
    writeln!(writer)?;

    Ok(())
}
