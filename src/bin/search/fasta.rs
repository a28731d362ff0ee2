//! Minimal FASTA reading, just enough to drive the core end-to-end.
//!
//! Proper FASTA/FASTQ parsing (quality scores, multi-format readers) is out
//! of scope for `nsearch-core` itself; this binary only needs sequences in
//! and a results file out.

use std::path::Path;

use bio::io::fasta;
use nsearch_core::Sequence;

use crate::error::CliError;

pub(crate) fn read_sequences(path: &Path) -> Result<Vec<Sequence>, CliError> {
    let reader = fasta::Reader::from_file(path)?;
    let mut sequences = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CliError::Fasta(e.to_string()))?;
        sequences.push(Sequence::new(record.id().to_string(), record.seq().to_vec()));
    }
    Ok(sequences)
}
