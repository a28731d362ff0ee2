//! Error types for the search core.
//!
//! The core itself is infallible in normal operation (see the crate-level
//! docs): a query with no acceptable target simply yields an empty hit
//! list, never an error. The one exception is misconfiguration detected at
//! database construction time.

/// Errors raised while configuring or building a [`crate::database::Database`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested k-mer length cannot be packed into the alphabet's
    /// fixed-width integer encoding (2 bits/symbol for DNA, capped at a
    /// 32-bit k-mer).
    #[error("kmer length {kmer_length} exceeds the maximum of {max} for this alphabet's encoding width")]
    KmerLengthTooLarge { kmer_length: usize, max: usize },

    /// The requested k-mer length is zero, which cannot encode a window.
    #[error("kmer length must be at least 1")]
    KmerLengthZero,
}
