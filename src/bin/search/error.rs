//! Error handling for the `search` command-line tool.

/// Error type for the search CLI.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// IO error that occurs during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A FASTA record could not be parsed.
    #[error("FASTA parse error: {0}")]
    Fasta(String),

    /// JSON output could not be written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database configuration rejected, e.g. an oversized k-mer length.
    #[error("database configuration error: {0}")]
    Config(#[from] nsearch_core::ConfigError),

    /// Error opening a FASTA file.
    #[error("FASTA file error: {0}")]
    FastaFile(#[from] anyhow::Error),
}
