//! Record sources for the sampling passes.
//!
//! A corpus is not a handle but a capability: every call to
//! [`CorpusSource::open`] starts an independent, lazy read from the first
//! row. The pipeline opens one cursor to find the header and a second one to
//! stream the records, so nothing is shared between the passes.
//!
//! Rows are read as raw [`csv::ByteRecord`]s. No field is decoded, which
//! keeps message bytes intact whatever their encoding, and the reader is
//! `flexible` so short rows come through instead of aborting the pass.

use crate::error::{Result, SampleError};
use crate::io::compression::auto_detect_reader;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One row of the corpus.
pub type CorpusRecord = csv::ByteRecord;

/// Something that can be read from the top, any number of times.
pub trait CorpusSource {
    type Cursor: Iterator<Item = Result<CorpusRecord>>;

    /// Start a fresh pass positioned before the header row.
    ///
    /// # Errors
    /// Implementations fail with [`SampleError::Io`] if the underlying
    /// resource cannot be opened.
    fn open(&self) -> Result<Self::Cursor>;

    /// Short label used in logs and error messages.
    fn describe(&self) -> String;
}

/// Pull-based cursor over the rows of one pass. Finite and not restartable.
pub struct RecordCursor<R: Read> {
    input: String,
    records: csv::ByteRecordsIntoIter<R>,
    position: u64,
}

impl<R: Read> RecordCursor<R> {
    fn new(input: String, reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_byte_records();
        Self {
            input,
            records,
            position: 0,
        }
    }

    /// Rows handed out so far, header included.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> Iterator for RecordCursor<R> {
    type Item = Result<CorpusRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.records.next()?;
        self.position += 1;
        Some(next.map_err(|source| SampleError::Csv {
            input: self.input.clone(),
            record: self.position,
            source,
        }))
    }
}

/// A CSV file on disk, optionally compressed.
#[derive(Clone, Debug)]
pub struct CsvCorpus {
    path: PathBuf,
}

impl CsvCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for CsvCorpus {
    type Cursor = RecordCursor<Box<dyn Read>>;

    fn open(&self) -> Result<Self::Cursor> {
        let f = File::open(&self.path).map_err(|e| SampleError::io(&self.path, e))?;
        let rdr = auto_detect_reader(f, &self.path).map_err(|e| SampleError::io(&self.path, e))?;
        Ok(RecordCursor::new(self.describe(), rdr))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// CSV text held in memory. Cheap to clone and to reopen.
#[derive(Clone, Debug)]
pub struct MemoryCorpus {
    name: String,
    data: Arc<[u8]>,
}

impl MemoryCorpus {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            name: name.into(),
            data: Arc::from(data),
        }
    }
}

impl CorpusSource for MemoryCorpus {
    type Cursor = RecordCursor<Cursor<Arc<[u8]>>>;

    fn open(&self) -> Result<Self::Cursor> {
        Ok(RecordCursor::new(
            self.describe(),
            Cursor::new(Arc::clone(&self.data)),
        ))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rows_are_yielded_not_rejected() -> Result<()> {
        let corpus = MemoryCorpus::new("mem", "id,message\n1,hello\n2\n3,\"multi\nline\"\n");
        let rows: Vec<CorpusRecord> = corpus.open()?.collect::<Result<_>>()?;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2].len(), 1);
        assert_eq!(rows[3].get(1), Some(&b"multi\nline"[..]));
        Ok(())
    }

    #[test]
    fn every_open_starts_from_the_header() -> Result<()> {
        let corpus = MemoryCorpus::new("mem", "id,message\n1,a\n");
        let mut first = corpus.open()?;
        first.next();
        first.next();
        assert_eq!(first.position(), 2);
        let header = corpus.open()?.next().transpose()?;
        assert_eq!(header.as_ref().and_then(|r| r.get(0)), Some(&b"id"[..]));
        Ok(())
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CsvCorpus::new("/definitely/not/here.csv").open().err();
        assert!(matches!(err, Some(SampleError::Io { .. })));
    }
}
