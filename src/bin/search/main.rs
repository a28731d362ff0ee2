//! `search`: a command-line k-mer indexed sequence similarity search tool.
//!
//! Builds an inverted index over a FASTA database, then searches each
//! FASTA query against it, writing accepted hits to an alnout-style text
//! file.
//!
//! # Usage
//!
//! ```text
//! search <dna|protein> --query=<FILE> --database=<FILE> --out=<FILE> --minidentity=<FLOAT>
//!        [--maxaccepts=<INT>] [--maxrejects=<INT>] [--kmer-length=<INT>] [--threads=<INT>]
//! ```

mod alnout;
mod error;
mod fasta;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use nsearch_core::database::ProgressKind;
use nsearch_core::{Alphabet, Database, Dna, Protein, SearchEngine, SearchParams};
use rayon::prelude::*;

use error::CliError;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum AlphabetArg {
    Dna,
    Protein,
}

/// Command-line arguments for the similarity search tool.
#[derive(Parser, Debug)]
#[command(author, version, about = "K-mer indexed sequence similarity search")]
struct Args {
    /// Alphabet the query and database sequences are drawn from.
    alphabet: AlphabetArg,

    /// Path to the FASTA file of query sequences.
    #[arg(long)]
    query: PathBuf,

    /// Path to the FASTA file of reference (database) sequences.
    #[arg(long)]
    database: PathBuf,

    /// Path to the alnout-format results file.
    #[arg(long)]
    out: PathBuf,

    /// Minimum fraction identity required to accept a hit.
    #[arg(long)]
    minidentity: f64,

    /// Maximum accepted hits per query.
    #[arg(long, default_value_t = 1)]
    maxaccepts: usize,

    /// Maximum rejected candidates considered per query before giving up.
    #[arg(long, default_value_t = 8)]
    maxrejects: usize,

    /// K-mer length for the inverted index. Defaults to 8 for DNA, 4 for protein.
    #[arg(long)]
    kmer_length: Option<usize>,

    /// Number of worker threads. Defaults to the rayon global pool size.
    #[arg(long)]
    threads: Option<usize>,

    /// Write newline-delimited JSON instead of the alnout text format.
    #[arg(long)]
    json: bool,
}

fn setup_progress_bar(total: u64, label: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {label} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})"
            ))
            .unwrap()
            .progress_chars("#>-"),
    );
    bar
}

fn run<A: Alphabet>(args: &Args, default_kmer_length: usize) -> Result<(), CliError> {
    let kmer_length = args.kmer_length.unwrap_or(default_kmer_length);

    let db_sequences = fasta::read_sequences(&args.database)?;
    let query_sequences = fasta::read_sequences(&args.query)?;
    log::info!(
        "loaded {} database sequences, {} queries",
        db_sequences.len(),
        query_sequences.len()
    );

    let build_bar = setup_progress_bar(db_sequences.len() as u64, "indexing");
    let mut progress = |kind: ProgressKind, done: usize, total: usize| {
        if kind == ProgressKind::Indexing {
            build_bar.set_length(total as u64);
            build_bar.set_position(done as u64);
        }
    };
    let database: Database<A> =
        Database::build_with_progress(db_sequences, kmer_length, Some(&mut progress))?;
    build_bar.finish_and_clear();

    let params = SearchParams {
        min_identity: args.minidentity,
        max_accepts: args.maxaccepts,
        max_rejects: args.maxrejects,
        ..Default::default()
    };

    let search_bar = setup_progress_bar(query_sequences.len() as u64, "searching");
    let start = Instant::now();

    let results: Vec<_> = query_sequences
        .par_iter()
        .map_init(
            || SearchEngine::<A>::new(params),
            |engine, query| {
                let hits = engine.search(&database, query);
                search_bar.inc(1);
                (query, hits)
            },
        )
        .collect();
    search_bar.finish_and_clear();

    let out_file = File::create(&args.out)?;
    let mut writer = BufWriter::new(out_file);
    let mut total_hits = 0usize;
    for (query, hits) in &results {
        for hit in hits {
            if args.json {
                serde_json::to_writer(&mut writer, hit)?;
                writeln!(writer)?;
            } else {
                let target = &database.sequences()[hit.target_index];
                alnout::write_hit(&mut writer, hit, query, target)?;
            }
            total_hits += 1;
        }
    }

    log::info!(
        "processed {} queries, {} hits in {:.2}s",
        results.len(),
        total_hits,
        start.elapsed().as_secs_f32()
    );
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .expect("failed to configure thread pool");
    }

    let result = match args.alphabet {
        AlphabetArg::Dna => run::<Dna>(&args, 8),
        AlphabetArg::Protein => run::<Protein>(&args, 4),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
