//! End-to-end sampling run.
//!
//! [`run`] drives the whole job: header pass, sampling pass, exact-count
//! check, partitioning and one archive write per chunk. Either every
//! requested message ends up in an archive or the run fails and leaves no
//! archive of its own behind.

use crate::config::SamplerConfig;
use crate::error::{Result, SampleError};
use crate::io::corpus::CorpusSource;
use crate::io::mbox::{ArchiveWriter, FromEscape, WriteOutcome};
use crate::locator::find_field;
use crate::partition::partition;
use crate::sampler::{RngDraw, ReservoirSampler, SampleStats, SlotDraw};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What happened to one chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    /// 1-based, as used in the file name.
    pub ordinal: usize,
    pub path: PathBuf,
    pub messages: usize,
    pub bytes: u64,
    /// `false` when the chunk was empty and no file was created.
    pub written: bool,
}

/// Summary of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub input: String,
    pub field: String,
    pub field_position: usize,
    pub requested: usize,
    pub obtained: usize,
    pub stats: SampleStats,
    pub archives: Vec<ArchiveReport>,
    pub escape: FromEscape,
    pub seed: Option<u64>,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Paths of the archives that were actually written.
    pub fn written_paths(&self) -> impl Iterator<Item = &Path> {
        self.archives
            .iter()
            .filter(|a| a.written)
            .map(|a| a.path.as_path())
    }

    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    /// [`SampleError::Io`] if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(self)
            .map_err(|e| SampleError::io(path, e.into()))?;
        let mut file = File::create(path).map_err(|e| SampleError::io(path, e))?;
        file.write_all(formatted.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .map_err(|e| SampleError::io(path, e))
    }
}

/// Run with randomness seeded from `config.seed` and envelopes stamped now.
///
/// # Errors
/// See [`run_with`].
pub fn run<S: CorpusSource + ?Sized>(config: &SamplerConfig, corpus: &S) -> Result<RunReport> {
    let writer = ArchiveWriter::new(config.escape);
    run_with(config, corpus, RngDraw::seeded(config.seed), &writer)
}

/// Run with an explicit draw source and archive writer.
///
/// # Errors
/// - [`SampleError::Configuration`] for invalid settings, an empty corpus or
///   a missing field, before any sampling.
/// - [`SampleError::InsufficientData`] when fewer than `sample_size`
///   eligible records exist; nothing is written.
/// - Any read, lock or write failure. Archives written earlier in the same
///   run are removed before the error is returned.
pub fn run_with<S, D>(
    config: &SamplerConfig,
    corpus: &S,
    draw: D,
    writer: &ArchiveWriter,
) -> Result<RunReport>
where
    S: CorpusSource + ?Sized,
    D: SlotDraw,
{
    config.validate()?;
    let started = Instant::now();
    let input = corpus.describe();

    tracing::info!(input = %input, field = %config.field, "locating field");
    let field_position = find_field(corpus, &config.field)?;

    tracing::info!(
        input = %input,
        sample_size = config.sample_size,
        "reservoir sampling, this reads the whole corpus"
    );
    let mut cursor = corpus.open()?;
    if cursor.next().transpose()?.is_none() {
        return Err(SampleError::Configuration(format!(
            "corpus {input} became empty between passes"
        )));
    }
    let sample = ReservoirSampler::new(config.sample_size, field_position, draw)
        .with_progress_every(config.progress_every)
        .run(cursor)?;
    tracing::info!(
        obtained = sample.len(),
        rows = sample.stats.records_seen,
        skipped = sample.stats.skipped,
        "sampling complete"
    );

    if sample.len() != config.sample_size {
        return Err(SampleError::InsufficientData {
            input,
            requested: config.sample_size,
            obtained: sample.len(),
        });
    }

    let archives = write_archives(config, writer, &sample.messages)?;

    Ok(RunReport {
        input,
        field: config.field.clone(),
        field_position,
        requested: config.sample_size,
        obtained: sample.len(),
        stats: sample.stats,
        archives,
        escape: writer.escape(),
        seed: config.seed,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

fn write_archives<M: AsRef<[u8]>>(
    config: &SamplerConfig,
    writer: &ArchiveWriter,
    messages: &[M],
) -> Result<Vec<ArchiveReport>> {
    let mut reports = Vec::with_capacity(config.chunks);
    for (idx, chunk) in partition(messages, config.chunks).into_iter().enumerate() {
        let ordinal = idx + 1;
        let path = config.archive_path(ordinal);
        match writer.write(&path, chunk) {
            Ok(WriteOutcome::Written { messages, bytes }) => reports.push(ArchiveReport {
                ordinal,
                path,
                messages,
                bytes,
                written: true,
            }),
            Ok(WriteOutcome::Skipped) => reports.push(ArchiveReport {
                ordinal,
                path,
                messages: 0,
                bytes: 0,
                written: false,
            }),
            Err(e) => {
                discard_written(&reports);
                return Err(e);
            }
        }
    }
    Ok(reports)
}

fn discard_written(reports: &[ArchiveReport]) {
    for report in reports.iter().filter(|r| r.written) {
        match fs::remove_file(&report.path) {
            Ok(()) => tracing::warn!(path = %report.path.display(), "removed archive of failed run"),
            Err(e) => tracing::warn!(path = %report.path.display(), error = %e, "could not remove archive of failed run"),
        }
    }
}
