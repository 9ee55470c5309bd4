//! Run configuration.
//!
//! [`SamplerConfig`] carries every knob of a sampling run. It can be built in
//! code, deserialized from a JSON file with [`SamplerConfig::from_json_file`],
//! or assembled by the command-line front end, which layers its flags on top
//! of an optional file. Missing JSON keys fall back to the defaults below.
//!
//! ```
//! use mboxsample::config::SamplerConfig;
//!
//! let cfg: SamplerConfig = serde_json::from_str(r#"{ "sample_size": 500, "chunks": 4 }"#).unwrap();
//! assert_eq!(cfg.field, "message");
//! assert_eq!(cfg.archive_path(1).file_name().unwrap(), "samples_1.mbox");
//! ```

use crate::error::{Result, SampleError};
use crate::io::mbox::FromEscape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default total number of sampled messages.
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;
/// Default number of archive files.
pub const DEFAULT_CHUNKS: usize = 2;
/// Default corpus column holding the email payload.
pub const DEFAULT_FIELD: &str = "message";
/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "email_samples";
/// Default interval, in logical records, between progress log lines.
pub const DEFAULT_PROGRESS_EVERY: u64 = 50_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Corpus path. Optional here because a corpus can also be handed to
    /// the pipeline directly.
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub sample_size: usize,
    pub chunks: usize,
    pub field: String,
    /// Fixed seed; `None` draws entropy from the OS.
    pub seed: Option<u64>,
    pub escape: FromEscape,
    /// 0 disables progress logging.
    pub progress_every: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sample_size: DEFAULT_SAMPLE_SIZE,
            chunks: DEFAULT_CHUNKS,
            field: DEFAULT_FIELD.to_string(),
            seed: None,
            escape: FromEscape::default(),
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl SamplerConfig {
    /// Load a config from a JSON file.
    ///
    /// # Errors
    /// [`SampleError::Io`] if the file cannot be read, [`SampleError::ConfigFile`]
    /// if it is not a valid config document.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SampleError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| SampleError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings the pipeline cannot honor.
    ///
    /// # Errors
    /// [`SampleError::Configuration`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(SampleError::Configuration(
                "sample size must be at least 1".into(),
            ));
        }
        if self.chunks == 0 {
            return Err(SampleError::Configuration(
                "chunk count must be at least 1".into(),
            ));
        }
        if self.field.is_empty() {
            return Err(SampleError::Configuration(
                "field name must not be empty".into(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(SampleError::Configuration(
                "output directory must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Destination of the archive with the given 1-based ordinal.
    #[must_use]
    pub fn archive_path(&self, ordinal: usize) -> PathBuf {
        self.output_dir.join(format!("samples_{ordinal}.mbox"))
    }
}
