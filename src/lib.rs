//! # mboxsample
//!
//! Draw a uniform random sample of emails from an arbitrarily large CSV
//! corpus (the public Enron dump, for instance) and split it into a fixed
//! number of mbox archives, without ever holding more than the sample in
//! memory.
//!
//! ## Pipeline
//!
//! 1. [`locator`] reads the header row and finds the message column.
//! 2. [`sampler`] streams every remaining row once, keeping a reservoir of
//!    `k` messages (Algorithm R).
//! 3. [`partition`] cuts the reservoir into near-equal contiguous chunks.
//! 4. [`io::mbox`] writes each chunk to `samples_<n>.mbox` under an
//!    exclusive lock.
//!
//! [`pipeline::run`] wires the steps together and enforces the all-or-nothing
//! rule: a run that cannot gather exactly `k` messages writes nothing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mboxsample::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = SamplerConfig {
//!     sample_size: 1_000,
//!     chunks: 4,
//!     seed: Some(7),
//!     ..SamplerConfig::default()
//! };
//! let report = run(&config, &CsvCorpus::new("emails.csv.gz"))?;
//! for archive in &report.archives {
//!     println!("{}: {} messages", archive.path.display(), archive.messages);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `compression-gzip`, `compression-zstd`, `compression-bzip2`,
//!   `compression-xz`: transparent decompression of the corpus (all on by
//!   default)
//!
//! ## Module Overview
//!
//! - [`config`] - run settings, JSON loading and validation
//! - [`error`] - the [`SampleError`] type
//! - [`io`] - corpus sources, compression, archive locking and mbox framing
//! - [`locator`] - header lookup
//! - [`sampler`] - reservoir sampling
//! - [`partition`] - chunking
//! - [`pipeline`] - the end-to-end run and its report
//! - [`testing`] - fixtures and a scripted draw source for tests

pub mod config;
pub mod error;
pub mod io;
pub mod locator;
pub mod partition;
pub mod pipeline;
pub mod sampler;
pub mod testing;

pub use config::SamplerConfig;
pub use error::{Result, SampleError};
pub use io::corpus::{CorpusRecord, CorpusSource, CsvCorpus, MemoryCorpus};
pub use io::mbox::{ArchiveWriter, FromEscape, MboxRecord, WriteOutcome, read_mbox};
pub use locator::{find_field, locate_field};
pub use partition::{chunk_ranges, partition};
pub use pipeline::{ArchiveReport, RunReport, run, run_with};
pub use sampler::{Message, ReservoirSampler, RngDraw, Sample, SampleStats, SlotDraw};
