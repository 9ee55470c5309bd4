//! Sequential mailbox (mbox) archives.
//!
//! This module provides:
//! - **Writing** one chunk of messages into one archive: [`ArchiveWriter`]
//! - **Reading** an archive back into records: [`read_mbox`], [`parse_mbox`]
//! - The in-body `From ` line policy shared by both: [`FromEscape`]
//!
//! # Framing
//! Every record is one envelope line, the message bytes, and a `\n`
//! separator (a blank line when the message ends with a newline):
//!
//! ```text
//! From MAILER-DAEMON Thu Jan  1 00:00:00 1970
//! Message-ID: <1@example>
//! Subject: hi
//!
//! body
//!
//! From MAILER-DAEMON Thu Jan  1 00:00:00 1970
//! ...
//! ```
//!
//! Under [`FromEscape::Mboxrd`] the separator is a single `\n` appended to
//! the message, so a record reads back exactly as written even when the
//! message has no final newline (it then ends right before the next
//! envelope). [`FromEscape::Verbatim`] pads such a message with a newline
//! first, the way traditional mbox writers do. Nothing else in the message
//! is touched: headers are not parsed, line endings are not normalized.
//!
//! # Design notes
//! - The destination is locked (see [`ArchiveLock`]) for the whole write.
//! - A failed write removes the half-written destination before returning.
//! - An empty chunk creates no file; the caller gets [`WriteOutcome::Skipped`].

use crate::error::{Result, SampleError};
use crate::io::lock::ArchiveLock;
use chrono::{DateTime, Utc};
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

/// Marker starting every archive record.
pub const FROM_MARKER: &[u8] = b"From ";

/// Sender placed in generated envelope lines.
pub const DEFAULT_SENDER: &str = "MAILER-DAEMON";

static FROM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(>*From )").expect("static regex"));

static QUOTED_FROM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^>(>*From )").expect("static regex"));

/// How lines starting with `From ` inside a message are stored.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FromEscape {
    /// Write message bytes untouched. A reader will see an in-body
    /// `From ` line as the start of a new record.
    Verbatim,
    /// mboxrd quoting: `>*From ` lines gain one `>` on write and lose one
    /// on read, which makes the transform reversible.
    #[default]
    Mboxrd,
}

impl FromEscape {
    /// Apply the write-side transform.
    #[must_use]
    pub fn escape(self, message: &[u8]) -> Cow<'_, [u8]> {
        match self {
            Self::Verbatim => Cow::Borrowed(message),
            Self::Mboxrd => FROM_LINE.replace_all(message, &b">$1"[..]),
        }
    }

    /// Undo [`escape`](Self::escape).
    #[must_use]
    pub fn unescape(self, body: &[u8]) -> Cow<'_, [u8]> {
        match self {
            Self::Verbatim => Cow::Borrowed(body),
            Self::Mboxrd => QUOTED_FROM_LINE.replace_all(body, &b"$1"[..]),
        }
    }
}

/// Result of writing one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The archive was created or overwritten.
    Written { messages: usize, bytes: u64 },
    /// The chunk was empty; the destination was not touched.
    Skipped,
}

/// Serializes message sequences into mbox files.
#[derive(Clone, Debug)]
pub struct ArchiveWriter {
    escape: FromEscape,
    envelope: String,
}

impl ArchiveWriter {
    /// Writer stamping envelopes with the current UTC time.
    #[must_use]
    pub fn new(escape: FromEscape) -> Self {
        Self {
            escape,
            envelope: envelope_line(DEFAULT_SENDER, Utc::now()),
        }
    }

    /// Replace the envelope text following `From ` (sender and date).
    #[must_use]
    pub fn with_envelope(mut self, envelope: impl Into<String>) -> Self {
        self.envelope = envelope.into();
        self
    }

    #[must_use]
    pub const fn escape(&self) -> FromEscape {
        self.escape
    }

    /// Write `messages`, in order, as the complete content of `path`.
    ///
    /// Parent directories are created as needed. The archive lock is held
    /// from before the file is opened until after it has been synced.
    ///
    /// # Errors
    /// [`SampleError::Locked`] when another writer holds the destination,
    /// [`SampleError::Io`] on any filesystem failure. In the latter case a
    /// partially written destination is removed.
    pub fn write<M: AsRef<[u8]>>(&self, path: impl AsRef<Path>, messages: &[M]) -> Result<WriteOutcome> {
        let path = path.as_ref();
        if messages.is_empty() {
            tracing::info!(path = %path.display(), "empty chunk, no archive written");
            return Ok(WriteOutcome::Skipped);
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| SampleError::io(parent, e))?;
        }

        let _lock = ArchiveLock::acquire(path)?;
        match self.write_locked(path, messages) {
            Ok(bytes) => {
                tracing::info!(
                    path = %path.display(),
                    messages = messages.len(),
                    bytes,
                    "archive written"
                );
                Ok(WriteOutcome::Written {
                    messages: messages.len(),
                    bytes,
                })
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(path)
                    && rm.kind() != io::ErrorKind::NotFound
                {
                    tracing::warn!(path = %path.display(), error = %rm, "could not remove partial archive");
                }
                Err(SampleError::io(path, e))
            }
        }
    }

    fn write_locked<M: AsRef<[u8]>>(&self, path: &Path, messages: &[M]) -> io::Result<u64> {
        let file = File::create(path)?;
        let mut w = CountingWriter::new(BufWriter::new(file));
        for msg in messages {
            self.write_record(&mut w, msg.as_ref())?;
        }
        let bytes = w.count;
        let file = w.inner.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        Ok(bytes)
    }

    fn write_record<W: Write>(&self, w: &mut W, message: &[u8]) -> io::Result<()> {
        w.write_all(FROM_MARKER)?;
        w.write_all(self.envelope.as_bytes())?;
        w.write_all(b"\n")?;
        let body = self.escape.escape(message);
        w.write_all(&body)?;
        if self.escape == FromEscape::Verbatim && !body.ends_with(b"\n") {
            w.write_all(b"\n")?;
        }
        w.write_all(b"\n")
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new(FromEscape::default())
    }
}

/// Envelope text in the traditional `asctime` layout, e.g.
/// `MAILER-DAEMON Thu Jan  1 00:00:00 1970`.
#[must_use]
pub fn envelope_line(sender: &str, at: DateTime<Utc>) -> String {
    format!("{sender} {}", at.format("%a %b %e %H:%M:%S %Y"))
}

struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountingWriter<W> {
    const fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One record parsed from an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MboxRecord {
    /// Envelope text after the `From ` marker, line ending stripped.
    pub envelope: String,
    /// Message bytes with the separator removed and escaping undone.
    pub message: Vec<u8>,
}

/// Split archive bytes into records.
///
/// Any line starting with `From ` opens a new record. Exactly one trailing
/// newline (the separator) is removed from each record before `escape` is
/// undone.
///
/// # Errors
/// `InvalidData` if non-empty content precedes the first envelope line.
pub fn parse_mbox(data: &[u8], escape: FromEscape) -> io::Result<Vec<MboxRecord>> {
    let mut records = Vec::new();
    let mut current: Option<(String, Vec<u8>)> = None;

    for line in data.split_inclusive(|&b| b == b'\n') {
        if let Some(rest) = line.strip_prefix(FROM_MARKER) {
            if let Some(done) = current.take() {
                records.push(finish_record(done, escape));
            }
            let envelope = String::from_utf8_lossy(rest)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            current = Some((envelope, Vec::new()));
            continue;
        }
        match current.as_mut() {
            Some((_, body)) => body.extend_from_slice(line),
            None if line.iter().all(u8::is_ascii_whitespace) => {}
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "archive does not start with a From line",
                ));
            }
        }
    }
    if let Some(done) = current.take() {
        records.push(finish_record(done, escape));
    }
    Ok(records)
}

fn finish_record((envelope, mut body): (String, Vec<u8>), escape: FromEscape) -> MboxRecord {
    if body.ends_with(b"\n") {
        body.pop();
    }
    let message = match escape.unescape(&body) {
        Cow::Borrowed(_) => body,
        Cow::Owned(v) => v,
    };
    MboxRecord { envelope, message }
}

/// Read and parse an archive from disk.
///
/// # Errors
/// [`SampleError::Io`] if the file cannot be read or is not an mbox.
pub fn read_mbox(path: impl AsRef<Path>, escape: FromEscape) -> Result<Vec<MboxRecord>> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| SampleError::io(path, e))?;
    parse_mbox(&data, escape).map_err(|e| SampleError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ENVELOPE: &str = "MAILER-DAEMON Thu Jan  1 00:00:00 1970";

    fn writer(escape: FromEscape) -> ArchiveWriter {
        ArchiveWriter::new(escape).with_envelope(ENVELOPE)
    }

    #[test]
    fn envelope_uses_asctime_layout() {
        let at = Utc.with_ymd_and_hms(2001, 5, 4, 13, 7, 9).unwrap();
        assert_eq!(
            envelope_line("MAILER-DAEMON", at),
            "MAILER-DAEMON Fri May  4 13:07:09 2001"
        );
    }

    #[test]
    fn mboxrd_escapes_nested_quotes() {
        let msg = b"Subject: x\n\nFrom here\n>From there\nnot From\n";
        let esc = FromEscape::Mboxrd.escape(msg);
        assert_eq!(
            &esc[..],
            &b"Subject: x\n\n>From here\n>>From there\nnot From\n"[..]
        );
        assert_eq!(&FromEscape::Mboxrd.unescape(&esc)[..], &msg[..]);
    }

    #[test]
    fn verbatim_leaves_bytes_alone() {
        let msg = b"From me\nFrom you\n";
        assert!(matches!(FromEscape::Verbatim.escape(msg), Cow::Borrowed(_)));
    }

    #[test]
    fn exact_file_layout() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("samples_1.mbox");
        let out = writer(FromEscape::Mboxrd).write(&path, &["Subject: a\n\nx", "Subject: b\n\ny\n"])?;
        let expected = format!(
            "From {ENVELOPE}\nSubject: a\n\nx\nFrom {ENVELOPE}\nSubject: b\n\ny\n\n"
        );
        assert_eq!(fs::read_to_string(&path)?, expected);
        assert_eq!(
            out,
            WriteOutcome::Written {
                messages: 2,
                bytes: expected.len() as u64
            }
        );
        assert!(!crate::io::lock::lock_path_for(&path).exists());
        Ok(())
    }

    #[test]
    fn roundtrip_with_in_body_from_lines() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested").join("samples_2.mbox");
        let messages = vec![
            "Subject: one\n\nFrom the desk of Ken\n".to_string(),
            "From: a@enron.com\r\nSubject: two\r\n\r\n>From quoted\r\n".to_string(),
            "Subject: three\n\n\n\ntrailing blank lines\n\n".to_string(),
        ];
        writer(FromEscape::Mboxrd).write(&path, &messages)?;

        let back = read_mbox(&path, FromEscape::Mboxrd)?;
        assert_eq!(back.len(), messages.len());
        for (rec, msg) in back.iter().zip(&messages) {
            assert_eq!(rec.envelope, ENVELOPE);
            assert_eq!(rec.message, msg.as_bytes());
        }
        Ok(())
    }

    #[test]
    fn verbatim_reproduces_the_split_gap() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("v.mbox");
        writer(FromEscape::Verbatim).write(&path, &["Subject: s\n\nFrom the desk\n"])?;
        // an unescaped in-body From line reads back as a second record
        let back = read_mbox(&path, FromEscape::Verbatim)?;
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].envelope, "the desk");
        Ok(())
    }

    #[test]
    fn empty_chunk_is_skipped_and_leaves_existing_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("samples_1.mbox");
        fs::write(&path, b"placeholder")?;
        let out = writer(FromEscape::Mboxrd).write::<String>(&path, &[])?;
        assert_eq!(out, WriteOutcome::Skipped);
        assert_eq!(fs::read(&path)?, b"placeholder");

        let missing = tmp.path().join("samples_2.mbox");
        writer(FromEscape::Mboxrd).write::<&str>(&missing, &[])?;
        assert!(!missing.exists());
        Ok(())
    }

    #[test]
    fn held_lock_blocks_writer_without_touching_destination() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("samples_1.mbox");
        fs::write(&path, b"old")?;

        let held = ArchiveLock::acquire(&path)?;
        let err = writer(FromEscape::Mboxrd).write(&path, &["m\n"]).unwrap_err();
        assert!(matches!(err, SampleError::Locked { .. }));
        assert_eq!(fs::read(&path)?, b"old");
        // the failed writer must not have released someone else's lock
        assert!(held.lock_path().exists());
        drop(held);

        writer(FromEscape::Mboxrd).write(&path, &["m\n"])?;
        assert_eq!(read_mbox(&path, FromEscape::Mboxrd)?.len(), 1);
        Ok(())
    }

    #[test]
    fn parse_rejects_leading_garbage() {
        let err = parse_mbox(b"Subject: orphan\n", FromEscape::Mboxrd).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(parse_mbox(b"", FromEscape::Mboxrd).unwrap().is_empty());
    }

    #[test]
    fn mboxrd_roundtrips_messages_without_final_newline() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("samples_1.mbox");
        let messages = ["Subject: a\n\nno newline at end", "", "\n", "Subject: b\n\nends\n"];
        writer(FromEscape::Mboxrd).write(&path, &messages)?;

        let back = read_mbox(&path, FromEscape::Mboxrd)?;
        let got: Vec<&[u8]> = back.iter().map(|r| r.message.as_slice()).collect();
        let want: Vec<&[u8]> = messages.iter().map(|m| m.as_bytes()).collect();
        assert_eq!(got, want);
        Ok(())
    }

    #[test]
    fn verbatim_pads_unterminated_messages() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("v.mbox");
        writer(FromEscape::Verbatim).write(&path, &["Subject: a\n\nx", ""])?;
        assert_eq!(
            fs::read_to_string(&path)?,
            format!("From {ENVELOPE}\nSubject: a\n\nx\n\nFrom {ENVELOPE}\n\n\n")
        );
        let back = read_mbox(&path, FromEscape::Verbatim)?;
        assert_eq!(back[0].message, b"Subject: a\n\nx\n");
        assert_eq!(back[1].message, b"\n");
        Ok(())
    }

    #[test]
    fn failed_write_releases_lock() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("samples_1.mbox");
        // a directory in the way makes the create fail once the lock is held
        fs::create_dir(&path)?;

        let err = writer(FromEscape::Mboxrd).write(&path, &["m\n"]).unwrap_err();
        assert!(matches!(err, SampleError::Io { .. }), "{err}");
        assert!(!crate::io::lock::lock_path_for(&path).exists());
        assert!(path.is_dir());

        fs::remove_dir(&path)?;
        writer(FromEscape::Mboxrd).write(&path, &["m\n"])?;
        assert_eq!(read_mbox(&path, FromEscape::Mboxrd)?.len(), 1);
        assert!(!crate::io::lock::lock_path_for(&path).exists());
        Ok(())
    }
}
