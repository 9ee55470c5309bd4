//! Error types for the sampling pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sampling operations.
pub type Result<T> = std::result::Result<T, SampleError>;

/// Everything that can abort a sampling run.
///
/// Malformed corpus rows are not represented here: the sampler skips them
/// and counts them in [`SampleStats::skipped`](crate::sampler::SampleStats).
#[derive(Error, Debug)]
pub enum SampleError {
    /// Missing field, empty corpus or invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The corpus ran out before the requested sample size was reached.
    #[error(
        "insufficient data in {input}: requested {requested} samples but only {obtained} eligible records were found"
    )]
    InsufficientData {
        /// Human-readable description of the corpus.
        input: String,
        /// Sample size asked for.
        requested: usize,
        /// Messages actually held by the reservoir.
        obtained: usize,
    },

    /// Opening, reading or writing a path failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed on a record.
    #[error("CSV error in {input} at record #{record}: {source}")]
    Csv {
        input: String,
        record: u64,
        #[source]
        source: csv::Error,
    },

    /// Another writer holds the archive lock.
    #[error("archive {} is locked by another writer (lock file {})", .path.display(), .lock.display())]
    Locked { path: PathBuf, lock: PathBuf },

    /// A JSON config file could not be parsed.
    #[error("invalid config file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SampleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure happened before any sampling work began.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::ConfigFile { .. })
    }
}
