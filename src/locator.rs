//! Header lookup for the sampled column.

use crate::error::{Result, SampleError};
use crate::io::corpus::{CorpusRecord, CorpusSource};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read exactly one record from `records` as the header and return the
/// zero-based position of `name` in it.
///
/// Matching is exact and byte-wise; the first occurrence wins. A byte order
/// mark in front of the first column name is ignored.
///
/// # Errors
/// [`SampleError::Configuration`] when the source is empty or the header has
/// no such column; the read error itself when the header cannot be parsed.
pub fn locate_field<I>(records: &mut I, name: &str) -> Result<usize>
where
    I: Iterator<Item = Result<CorpusRecord>> + ?Sized,
{
    let Some(header) = records.next() else {
        return Err(SampleError::Configuration(
            "corpus is empty: no header row".into(),
        ));
    };
    let header = header?;

    header
        .iter()
        .enumerate()
        .position(|(i, col)| {
            let col = if i == 0 {
                col.strip_prefix(UTF8_BOM).unwrap_or(col)
            } else {
                col
            };
            col == name.as_bytes()
        })
        .ok_or_else(|| {
            let columns: Vec<_> = header.iter().map(String::from_utf8_lossy).collect();
            SampleError::Configuration(format!(
                "field '{name}' not found in header [{}]",
                columns.join(", ")
            ))
        })
}

/// First pass over `corpus`: open a cursor, read the header, close it.
///
/// # Errors
/// See [`locate_field`]; also fails if the corpus cannot be opened.
pub fn find_field<S: CorpusSource + ?Sized>(corpus: &S, name: &str) -> Result<usize> {
    let mut cursor = corpus.open()?;
    let position = locate_field(&mut cursor, name)?;
    tracing::debug!(input = %corpus.describe(), field = name, position, "field located");
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::corpus::MemoryCorpus;

    #[test]
    fn finds_message_column() -> Result<()> {
        let corpus = MemoryCorpus::new("mem", "file,message\na.txt,hello\n");
        assert_eq!(find_field(&corpus, "message")?, 1);
        assert_eq!(find_field(&corpus, "file")?, 0);
        Ok(())
    }

    #[test]
    fn consumes_only_the_header() -> Result<()> {
        let corpus = MemoryCorpus::new("mem", "message\nfirst\nsecond\n");
        let mut cursor = corpus.open()?;
        assert_eq!(locate_field(&mut cursor, "message")?, 0);
        let next = cursor.next().transpose()?;
        assert_eq!(next.and_then(|r| r.get(0).map(<[u8]>::to_vec)), Some(b"first".to_vec()));
        Ok(())
    }

    #[test]
    fn missing_field_is_configuration_error() {
        let corpus = MemoryCorpus::new("mem", "id,body\n1,x\n");
        let err = find_field(&corpus, "message").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("id, body"));
    }

    #[test]
    fn empty_corpus_is_configuration_error() {
        let corpus = MemoryCorpus::new("mem", "");
        let err = find_field(&corpus, "message").unwrap_err();
        assert!(matches!(err, SampleError::Configuration(ref m) if m.contains("empty")));
    }

    #[test]
    fn byte_order_mark_is_ignored() -> Result<()> {
        let corpus = MemoryCorpus::new("mem", b"\xEF\xBB\xBFmessage,id\nx,1\n".to_vec());
        assert_eq!(find_field(&corpus, "message")?, 0);
        Ok(())
    }

    #[test]
    fn duplicate_names_pick_the_first() -> Result<()> {
        let corpus = MemoryCorpus::new("mem", "message,message\na,b\n");
        assert_eq!(find_field(&corpus, "message")?, 0);
        Ok(())
    }
}
