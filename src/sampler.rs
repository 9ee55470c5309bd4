//! Single-pass reservoir sampling over corpus records.
//!
//! [`ReservoirSampler`] implements Algorithm R over a stream of
//! [`CorpusRecord`]s, keeping at most `k` [`Message`]s in memory no matter
//! how long the stream is.
//!
//! A logical counter `i` advances once per record read, **including** rows
//! too short to hold the sampled field. Those rows are skipped but still
//! consume a counter value, so the replacement draw for a later record uses
//! `[0, i]` with `i` counting every row seen. Textbook Algorithm R would count
//! eligible rows only; the all-rows counter is kept for compatibility with
//! samples produced by earlier runs of this tool.
//!
//! Randomness comes from an injected [`SlotDraw`], so tests can script the
//! draws and production code can fix a seed.

use crate::error::Result;
use crate::io::corpus::CorpusRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source of the replacement-slot draws.
pub trait SlotDraw {
    /// A uniform integer in `[0, upper]`, both ends inclusive.
    fn draw_inclusive(&mut self, upper: u64) -> u64;
}

impl<D: SlotDraw + ?Sized> SlotDraw for &mut D {
    fn draw_inclusive(&mut self, upper: u64) -> u64 {
        (**self).draw_inclusive(upper)
    }
}

/// [`SlotDraw`] backed by a `rand` generator.
#[derive(Clone, Debug)]
pub struct RngDraw<R = StdRng>(R);

impl RngDraw<StdRng> {
    /// Seeded from `seed` when given, from OS entropy otherwise.
    #[must_use]
    pub fn seeded(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self(StdRng::seed_from_u64(s)),
            None => Self(StdRng::from_entropy()),
        }
    }
}

impl<R: Rng> RngDraw<R> {
    pub const fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: Rng> SlotDraw for RngDraw<R> {
    fn draw_inclusive(&mut self, upper: u64) -> u64 {
        self.0.gen_range(0..=upper)
    }
}

/// One sampled email, kept as the raw bytes of its corpus field.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Message(Vec<u8>);

impl Message {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Message {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for Message {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl From<&str> for Message {
    fn from(v: &str) -> Self {
        Self(v.as_bytes().to_vec())
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// Counters gathered during one sampling pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStats {
    /// Every row after the header, eligible or not.
    pub records_seen: u64,
    pub eligible: u64,
    /// Rows without the sampled field.
    pub skipped: u64,
    /// Times a reservoir slot was overwritten.
    pub replacements: u64,
}

/// Final reservoir plus the pass statistics.
#[derive(Clone, Debug)]
pub struct Sample {
    pub messages: Vec<Message>,
    pub stats: SampleStats,
}

impl Sample {
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Streaming Algorithm R sampler.
///
/// Feed it records with [`offer`](Self::offer) or hand it a whole cursor
/// with [`run`](Self::run). The cursor must already be past the header.
pub struct ReservoirSampler<D> {
    capacity: usize,
    field: usize,
    draw: D,
    progress_every: u64,
    reservoir: Vec<Message>,
    stats: SampleStats,
}

impl<D: SlotDraw> ReservoirSampler<D> {
    /// Sampler keeping up to `capacity` values of column `field`.
    pub fn new(capacity: usize, field: usize, draw: D) -> Self {
        Self {
            capacity,
            field,
            draw,
            progress_every: 0,
            reservoir: Vec::with_capacity(capacity.min(1 << 16)),
            stats: SampleStats::default(),
        }
    }

    /// Log a progress line every `n` records; 0 disables it.
    #[must_use]
    pub fn with_progress_every(mut self, n: u64) -> Self {
        self.progress_every = n;
        self
    }

    /// Process one record.
    pub fn offer(&mut self, record: &CorpusRecord) {
        let i = self.stats.records_seen;
        self.stats.records_seen += 1;
        if self.progress_every > 0 && self.stats.records_seen % self.progress_every == 0 {
            tracing::info!(rows = self.stats.records_seen, "sampling progress");
        }

        let Some(value) = record.get(self.field) else {
            self.stats.skipped += 1;
            return;
        };
        self.stats.eligible += 1;

        if self.reservoir.len() < self.capacity {
            self.reservoir.push(Message::from(value));
            return;
        }
        if self.capacity == 0 {
            return;
        }
        let j = self.draw.draw_inclusive(i);
        if j < self.capacity as u64 {
            // j < capacity == reservoir.len() here
            self.reservoir[j as usize] = Message::from(value);
            self.stats.replacements += 1;
        }
    }

    /// Drain `records` through [`offer`](Self::offer) and finish.
    ///
    /// # Errors
    /// The first read error produced by the cursor.
    pub fn run<I>(mut self, records: I) -> Result<Sample>
    where
        I: IntoIterator<Item = Result<CorpusRecord>>,
    {
        for record in records {
            self.offer(&record?);
        }
        Ok(self.finish())
    }

    #[must_use]
    pub fn finish(self) -> Sample {
        tracing::debug!(
            kept = self.reservoir.len(),
            seen = self.stats.records_seen,
            skipped = self.stats.skipped,
            "sampling finished"
        );
        Sample {
            messages: self.reservoir,
            stats: self.stats,
        }
    }
}
