//! Transparent compression for corpus files.
//!
//! Large mail corpora are usually shipped compressed. [`auto_detect_reader`]
//! wraps a raw file reader with the right decoder so the CSV layer can keep
//! streaming records without ever materializing the decompressed file.
//! [`auto_detect_writer`] is the symmetric helper used when producing corpus
//! fixtures.
//!
//! Detection checks the file extension first and falls back to the magic
//! bytes at the head of the stream. Each codec sits behind its own cargo
//! feature:
//! - **Gzip** (`.gz`, `.gzip`) via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`, `.zstd`) via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`, `.bzip2`) via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) via `xz2` (feature: `compression-xz`)
//!
//! With every feature disabled both helpers degrade to plain buffered I/O.

use std::io::{BufRead, BufReader, BufWriter, Read, Result, Write};
use std::path::Path;

/// A compression format that can wrap readers and writers.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip", "zstd").
    fn name(&self) -> &'static str;

    /// Lowercase file extensions, leading dot included.
    fn extensions(&self) -> &'static [&'static str];

    /// Signature at the start of a compressed stream, if the format has one.
    fn magic_bytes(&self) -> Option<&'static [u8]>;

    fn wrap_reader(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>>;

    fn wrap_writer(&self, writer: Box<dyn Write>) -> Result<Box<dyn Write>>;
}

static CODECS: &[&dyn CompressionCodec] = &[
    #[cfg(feature = "compression-gzip")]
    &GzipCodec,
    #[cfg(feature = "compression-zstd")]
    &ZstdCodec,
    #[cfg(feature = "compression-bzip2")]
    &Bzip2Codec,
    #[cfg(feature = "compression-xz")]
    &XzCodec,
];

/// Match a path against the codec extensions, case-insensitively.
#[must_use]
pub fn detect_from_extension(path: impl AsRef<Path>) -> Option<&'static dyn CompressionCodec> {
    let path_str = path.as_ref().to_string_lossy().to_lowercase();
    CODECS
        .iter()
        .copied()
        .find(|codec| codec.extensions().iter().any(|ext| path_str.ends_with(ext)))
}

/// Peek at the buffered head of a stream without consuming it.
fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<&'static dyn CompressionCodec> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    CODECS.iter().copied().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| buf.starts_with(magic))
    })
}

/// Wrap `reader` with a decoder when `path_hint` or the stream content says
/// it is compressed; otherwise return it buffered.
///
/// # Errors
/// Returns the decoder's construction error (zstd validates its frame
/// header eagerly, for instance).
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(&path_hint) {
        tracing::debug!(codec = codec.name(), "decompressing by extension");
        return codec.wrap_reader(Box::new(reader));
    }

    let mut buf_reader = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buf_reader) {
        tracing::debug!(codec = codec.name(), "decompressing by magic bytes");
        return codec.wrap_reader(Box::new(buf_reader));
    }

    Ok(Box::new(buf_reader))
}

/// Wrap `writer` with an encoder chosen by the extension of `path_hint`.
///
/// Encoders finish their stream when dropped, so callers should flush and
/// then drop the returned writer before reading the file back.
///
/// # Errors
/// Returns the encoder's construction error.
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Write>> {
    match detect_from_extension(&path_hint) {
        Some(codec) => codec.wrap_writer(Box::new(writer)),
        None => Ok(Box::new(BufWriter::new(writer))),
    }
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&'static [u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>> {
        // Multi-member archives (concatenated gzip) are common for dumps.
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> Result<Box<dyn Write>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&'static [u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> Result<Box<dyn Write>> {
        zstd::stream::write::Encoder::new(writer, 3)
            .map(|e| Box::new(e.auto_finish()) as Box<dyn Write>)
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> Option<&'static [u8]> {
        // "BZh", the block-size digit follows
        Some(b"BZh")
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>> {
        Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> Result<Box<dyn Write>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(BzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &'static str {
        "xz"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&'static [u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>> {
        Ok(Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write>) -> Result<Box<dyn Write>> {
        Ok(Box::new(xz2::write::XzEncoder::new(writer, 6)))
    }
}
