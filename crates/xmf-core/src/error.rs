//! Error types for xmf

use std::path::PathBuf;

use thiserror::Error;

/// xmf error type
///
/// Every variant is fatal to a run: the pipeline is a single batch job and a
/// data-integrity failure invalidates all downstream statistics.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Chain file could not be repaired into a non-empty set of draws
    #[error("malformed chain: {0}")]
    MalformedChain(String),

    /// A reshape or pairing assumption on the input files was violated
    #[error("dimension mismatch: {context} (expected {expected}, got {actual})")]
    DimensionMismatch {
        /// What was being matched.
        context: String,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// Too few unique credible draws for the ensemble sample
    #[error("insufficient samples: {available} unique draws, need at least {required}")]
    InsufficientSamples {
        /// Unique draws left after deduplication.
        available: usize,
        /// Minimum required.
        required: usize,
    },

    /// Input catalog does not exist
    #[error("catalog not found: {}", .0.display())]
    CatalogNotFound(PathBuf),

    /// Catalog format tag is not supported
    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = Error::DimensionMismatch {
            context: "chi2 vs chain rows".to_string(),
            expected: 10,
            actual: 9,
        };
        assert_eq!(e.to_string(), "dimension mismatch: chi2 vs chain rows (expected 10, got 9)");

        let e = Error::InsufficientSamples { available: 42, required: 100 };
        assert!(e.to_string().contains("42 unique draws"));

        let e = Error::CatalogNotFound(PathBuf::from("/nope/eco_all.csv"));
        assert_eq!(e.to_string(), "catalog not found: /nope/eco_all.csv");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
