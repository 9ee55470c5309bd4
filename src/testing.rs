//! Test utilities: corpus fixtures and a scripted draw source.
//!
//! ```
//! use mboxsample::testing::{ScriptedDraw, enron_corpus};
//! use mboxsample::io::corpus::MemoryCorpus;
//!
//! let corpus = MemoryCorpus::new("fixture", enron_corpus(8));
//! let draw = ScriptedDraw::always_upper();
//! # let _ = (corpus, draw);
//! ```

use crate::io::compression::auto_detect_writer;
use crate::sampler::SlotDraw;
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
enum Script {
    Always(u64),
    Upper,
    Sequence(VecDeque<u64>),
}

/// A [`SlotDraw`] with predetermined answers that records every bound it
/// was asked for.
#[derive(Clone, Debug)]
pub struct ScriptedDraw {
    script: Script,
    bounds: Vec<u64>,
}

impl ScriptedDraw {
    /// Always answer `value`, clamped to the requested bound.
    #[must_use]
    pub const fn always(value: u64) -> Self {
        Self {
            script: Script::Always(value),
            bounds: Vec::new(),
        }
    }

    /// Always answer the upper bound itself. Once the reservoir is full this
    /// never displaces anything.
    #[must_use]
    pub const fn always_upper() -> Self {
        Self {
            script: Script::Upper,
            bounds: Vec::new(),
        }
    }

    /// Answer from `values` in order. Panics when they run out.
    pub fn sequence(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            script: Script::Sequence(values.into_iter().collect()),
            bounds: Vec::new(),
        }
    }

    /// Upper bounds requested so far, in order.
    #[must_use]
    pub fn bounds(&self) -> &[u64] {
        &self.bounds
    }
}

impl SlotDraw for ScriptedDraw {
    fn draw_inclusive(&mut self, upper: u64) -> u64 {
        self.bounds.push(upper);
        match &mut self.script {
            Script::Always(v) => (*v).min(upper),
            Script::Upper => upper,
            Script::Sequence(q) => {
                let v = q.pop_front().expect("scripted draws exhausted");
                assert!(v <= upper, "scripted draw {v} above bound {upper}");
                v
            }
        }
    }
}

/// Render a header and serializable rows (tuples, structs) as CSV bytes.
#[must_use]
pub fn corpus_csv<T: Serialize>(header: &[&str], rows: &[T]) -> Vec<u8> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(header).expect("write header");
    for row in rows {
        wtr.serialize(row).expect("serialize row");
    }
    wtr.into_inner().expect("flush csv buffer")
}

/// A realistic email in the shape of the public Enron dump: RFC 822
/// headers, CRLF-free, with the occasional body line starting `From `.
#[must_use]
pub fn enron_message(i: usize) -> String {
    let mut msg = format!(
        "Message-ID: <{i}.1075855687451.JavaMail.evans@thyme>\n\
         Date: Mon, 14 May 2001 16:39:00 -0700 (PDT)\n\
         From: sender{i}@enron.com\n\
         To: desk@enron.com\n\
         Subject: Forecast {i}\n\
         Mime-Version: 1.0\n\
         Content-Type: text/plain; charset=us-ascii\n\
         \n\
         Here is our forecast number {i}, \"as discussed\".\n"
    );
    if i % 3 == 0 {
        msg.push_str("\nFrom the desk of the trader:\n>From earlier thread\n");
    }
    msg
}

/// `n` Enron-style messages under the header `file,message`.
#[must_use]
pub fn enron_corpus(n: usize) -> Vec<u8> {
    let rows: Vec<(String, String)> = (0..n)
        .map(|i| (format!("allen-p/_sent_mail/{i}."), enron_message(i)))
        .collect();
    corpus_csv(&["file", "message"], &rows)
}

/// Write corpus bytes to `dir/name`, compressing according to the extension.
///
/// # Errors
/// Any I/O error creating or writing the file.
pub fn write_corpus_file(dir: &Path, name: &str, data: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(name);
    let mut w = auto_detect_writer(File::create(&path)?, &path)?;
    w.write_all(data)?;
    w.flush()?;
    drop(w);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_draw_records_bounds() {
        let mut d = ScriptedDraw::always(5);
        assert_eq!(d.draw_inclusive(3), 3);
        assert_eq!(d.draw_inclusive(9), 5);
        assert_eq!(d.bounds(), [3, 9]);

        let mut s = ScriptedDraw::sequence([0, 2]);
        assert_eq!(s.draw_inclusive(4), 0);
        assert_eq!(s.draw_inclusive(4), 2);
    }

    #[test]
    fn corpus_csv_quotes_multiline_fields() {
        let data = corpus_csv(&["id", "message"], &[("1", "a \"quoted\"\nline")]);
        assert_eq!(
            String::from_utf8(data).unwrap(),
            "id,message\n1,\"a \"\"quoted\"\"\nline\"\n"
        );
    }
}
