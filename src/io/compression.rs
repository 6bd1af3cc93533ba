//! Transparent stream compression for the row-oriented formats.
//!
//! Readers detect a codec from the file extension first and fall back to the
//! stream's magic bytes; writers go by extension only (or an explicit
//! [`Compression`]) and hand back an [`Encoder`] that must be finished. Each codec is behind its own feature flag:
//!
//! | codec | extensions        | feature             |
//! |-------|-------------------|---------------------|
//! | gzip  | `.gz`, `.gzip`    | `compression-gzip`  |
//! | zstd  | `.zst`, `.zstd`   | `compression-zstd`  |
//! | bzip2 | `.bz2`, `.bzip2`  | `compression-bzip2` |
//! | xz    | `.xz`             | `compression-xz`    |
//!
//! Compressed streams cannot be split, so a compressed file is always exactly
//! one partition.

use anyhow::{Context, Result, bail};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    Bzip2,
    Xz,
}

impl Compression {
    pub const ALL: [Compression; 4] = [
        Compression::Gzip,
        Compression::Zstd,
        Compression::Bzip2,
        Compression::Xz,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Zstd => "zstd",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
        }
    }

    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Compression::Gzip => &[".gz", ".gzip"],
            Compression::Zstd => &[".zst", ".zstd"],
            Compression::Bzip2 => &[".bz2", ".bzip2"],
            Compression::Xz => &[".xz"],
        }
    }

    #[must_use]
    pub fn magic_bytes(self) -> &'static [u8] {
        match self {
            Compression::Gzip => &[0x1f, 0x8b],
            Compression::Zstd => &[0x28, 0xb5, 0x2f, 0xfd],
            Compression::Bzip2 => b"BZh",
            Compression::Xz => &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00],
        }
    }

    /// Whether support for this codec was compiled in.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        match self {
            Compression::Gzip => cfg!(feature = "compression-gzip"),
            Compression::Zstd => cfg!(feature = "compression-zstd"),
            Compression::Bzip2 => cfg!(feature = "compression-bzip2"),
            Compression::Xz => cfg!(feature = "compression-xz"),
        }
    }

    /// Codec implied by the file name, if any (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().to_string_lossy().to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|c| c.is_enabled())
            .find(|c| c.extensions().iter().any(|ext| name.ends_with(ext)))
    }

    /// Codec identified by the first bytes of a stream, if any.
    ///
    /// bzip2 additionally requires the block-size digit after `BZh`, so text
    /// that merely starts with those letters stays plain.
    pub fn from_magic(head: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|c| c.is_enabled())
            .find(|c| match c {
                Compression::Bzip2 => {
                    head.starts_with(c.magic_bytes())
                        && matches!(head.get(3), Some(b'1'..=b'9'))
                }
                _ => head.starts_with(c.magic_bytes()),
            })
    }

    /// Wrap `reader` with this codec's decoder.
    pub fn decoder<'a>(self, reader: impl Read + 'a) -> Result<Box<dyn Read + 'a>> {
        match self {
            #[cfg(feature = "compression-gzip")]
            Compression::Gzip => Ok(Box::new(flate2::read::MultiGzDecoder::new(reader))),
            #[cfg(feature = "compression-zstd")]
            Compression::Zstd => Ok(Box::new(
                zstd::stream::read::Decoder::new(reader).context("init zstd decoder")?,
            )),
            #[cfg(feature = "compression-bzip2")]
            Compression::Bzip2 => Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader))),
            #[cfg(feature = "compression-xz")]
            Compression::Xz => Ok(Box::new(xz2::read::XzDecoder::new_multi_decoder(reader))),
            #[allow(unreachable_patterns)]
            other => bail!("{} support not compiled in", other.name()),
        }
    }

    /// Wrap `writer` with this codec's encoder. Call [`Encoder::finish`] to
    /// complete the frame.
    pub fn encoder<'a>(self, writer: impl Write + 'a) -> Result<Encoder<'a>> {
        let sink: Sink<'a> = BufWriter::new(Box::new(writer));
        match self {
            #[cfg(feature = "compression-gzip")]
            Compression::Gzip => Ok(Encoder::Gzip(flate2::write::GzEncoder::new(
                sink,
                flate2::Compression::default(),
            ))),
            #[cfg(feature = "compression-zstd")]
            Compression::Zstd => Ok(Encoder::Zstd(
                zstd::stream::write::Encoder::new(sink, 3).context("init zstd encoder")?,
            )),
            #[cfg(feature = "compression-bzip2")]
            Compression::Bzip2 => Ok(Encoder::Bzip2(bzip2::write::BzEncoder::new(
                sink,
                bzip2::Compression::default(),
            ))),
            #[cfg(feature = "compression-xz")]
            Compression::Xz => Ok(Encoder::Xz(xz2::write::XzEncoder::new(sink, 6))),
            #[allow(unreachable_patterns)]
            other => bail!("{} support not compiled in", other.name()),
        }
    }
}

type Sink<'a> = BufWriter<Box<dyn Write + 'a>>;

/// A buffered, optionally compressing byte sink.
///
/// [`finish`](Encoder::finish) writes the codec trailer and flushes. A zstd
/// frame left unfinished is truncated; the other codecs finish on drop but
/// any error there is lost.
pub enum Encoder<'a> {
    Plain(Sink<'a>),
    #[cfg(feature = "compression-gzip")]
    Gzip(flate2::write::GzEncoder<Sink<'a>>),
    #[cfg(feature = "compression-zstd")]
    Zstd(zstd::stream::write::Encoder<'static, Sink<'a>>),
    #[cfg(feature = "compression-bzip2")]
    Bzip2(bzip2::write::BzEncoder<Sink<'a>>),
    #[cfg(feature = "compression-xz")]
    Xz(xz2::write::XzEncoder<Sink<'a>>),
}

impl<'a> Encoder<'a> {
    /// Uncompressed, buffered.
    pub fn plain(writer: impl Write + 'a) -> Self {
        Encoder::Plain(BufWriter::new(Box::new(writer)))
    }

    fn as_write(&mut self) -> &mut dyn Write {
        match self {
            Encoder::Plain(w) => w,
            #[cfg(feature = "compression-gzip")]
            Encoder::Gzip(w) => w,
            #[cfg(feature = "compression-zstd")]
            Encoder::Zstd(w) => w,
            #[cfg(feature = "compression-bzip2")]
            Encoder::Bzip2(w) => w,
            #[cfg(feature = "compression-xz")]
            Encoder::Xz(w) => w,
        }
    }

    /// Complete the compressed frame and flush everything to the underlying
    /// writer.
    pub fn finish(self) -> Result<()> {
        let mut sink = match self {
            Encoder::Plain(w) => w,
            #[cfg(feature = "compression-gzip")]
            Encoder::Gzip(w) => w.finish().context("finish gzip stream")?,
            #[cfg(feature = "compression-zstd")]
            Encoder::Zstd(w) => w.finish().context("finish zstd stream")?,
            #[cfg(feature = "compression-bzip2")]
            Encoder::Bzip2(w) => w.finish().context("finish bzip2 stream")?,
            #[cfg(feature = "compression-xz")]
            Encoder::Xz(w) => w.finish().context("finish xz stream")?,
        };
        sink.flush().context("flush output")
    }
}

impl Write for Encoder<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.as_write().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.as_write().flush()
    }
}

/// Open a reader that transparently decompresses `reader`.
///
/// Detection order: extension of `path_hint`, then magic bytes, then plain.
pub fn auto_detect_reader<'a, R: Read + 'a>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn BufRead + 'a>> {
    let path_hint = path_hint.as_ref();
    if let Some(codec) = Compression::from_path(path_hint) {
        let dec = codec
            .decoder(reader)
            .with_context(|| format!("{} decoder for {}", codec.name(), path_hint.display()))?;
        return Ok(Box::new(BufReader::new(dec)));
    }

    let mut buffered = BufReader::new(reader);
    let head = buffered.fill_buf().context("peek stream header")?;
    if let Some(codec) = Compression::from_magic(head) {
        let dec = codec
            .decoder(buffered)
            .with_context(|| format!("{} decoder for {}", codec.name(), path_hint.display()))?;
        return Ok(Box::new(BufReader::new(dec)));
    }
    Ok(Box::new(buffered))
}

/// Open a writer that compresses according to the extension of `path_hint`.
pub fn auto_detect_writer<'a, W: Write + 'a>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> Result<Encoder<'a>> {
    match Compression::from_path(path_hint) {
        Some(codec) => codec.encoder(writer),
        None => Ok(Encoder::plain(writer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection_is_case_insensitive() {
        assert_eq!(Compression::from_path("a/B.CSV.GZ"), Some(Compression::Gzip));
        assert_eq!(Compression::from_path("x.json.zst"), Some(Compression::Zstd));
        assert_eq!(Compression::from_path("x.json"), None);
    }

    #[test]
    fn plain_text_is_not_mistaken_for_bzip2() {
        assert_eq!(Compression::from_magic(b"BZ,value\n"), None);
        assert_eq!(Compression::from_magic(b"BZh,x\n1,2\n"), None);
        assert_eq!(Compression::from_magic(b"BZh"), None);
        assert_eq!(Compression::from_magic(b"BZh0"), None);
        if Compression::Bzip2.is_enabled() {
            assert_eq!(Compression::from_magic(b"BZh91AY"), Some(Compression::Bzip2));
        }
    }

    #[cfg(feature = "compression-zstd")]
    #[test]
    fn finished_zstd_frame_decodes() -> Result<()> {
        let mut buf = Vec::new();
        let mut w = Compression::Zstd.encoder(&mut buf)?;
        w.write_all(b"a,b\n1,2\n")?;
        w.finish()?;
        let mut s = String::new();
        auto_detect_reader(buf.as_slice(), "x.zst")?.read_to_string(&mut s)?;
        assert_eq!(s, "a,b\n1,2\n");
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_round_trip_by_magic() -> Result<()> {
        let mut buf = Vec::new();
        {
            let mut w = Compression::Gzip.encoder(&mut buf)?;
            w.write_all(b"id,name\n1,a\n")?;
            w.finish()?;
        }
        let mut r = auto_detect_reader(buf.as_slice(), "no_extension")?;
        let mut s = String::new();
        r.read_to_string(&mut s)?;
        assert_eq!(s, "id,name\n1,a\n");
        Ok(())
    }
}
