//! TFRecord container framing.
//!
//! Each record is laid out as
//!
//! ```text
//! u64 LE  length
//! u32 LE  masked_crc32c(length bytes)
//! [u8]    data
//! u32 LE  masked_crc32c(data)
//! ```
//!
//! The payload is opaque here; see [`crate::image::example`] for the
//! `tf.train.Example` messages the ImageNet companion stores in it.

use crate::error::XShardsError;
use crate::io::compression::{auto_detect_reader, auto_detect_writer, Encoder};
use anyhow::{Context, Result};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, ErrorKind, Read, Write};
use std::path::Path;

const MASK_DELTA: u32 = 0xa282_ead8;

/// CRC32C (Castagnoli) of `data`, rotated and offset the way TFRecord stores it.
#[must_use]
pub fn masked_crc(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Appends framed records to a byte sink.
pub struct TfRecordWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> TfRecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write_record(&mut self, data: &[u8]) -> Result<()> {
        let len = (data.len() as u64).to_le_bytes();
        self.inner.write_all(&len)?;
        self.inner.write_all(&masked_crc(&len).to_le_bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_all(&masked_crc(data).to_le_bytes())?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush().context("flush TFRecord writer")?;
        Ok(self.inner)
    }
}

impl<'a> TfRecordWriter<Encoder<'a>> {
    /// Create `path` (and its parents). A compressed extension such as
    /// `.gz` selects the matching encoder; [`finish`](Self::finish) completes
    /// it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self::new(auto_detect_writer(f, path)?))
    }

    /// Complete the file. Returns the number of records written.
    pub fn finish(self) -> Result<usize> {
        let written = self.written;
        self.inner.finish().context("finish TFRecord file")?;
        Ok(written)
    }
}

/// Iterates the records of a TFRecord stream, verifying both checksums.
///
/// A clean end of stream between records ends the iteration; a stream that
/// ends inside a record, or a checksum mismatch, yields
/// [`XShardsError::CorruptRecord`] and then stops.
pub struct TfRecordReader<R: Read> {
    inner: R,
    index: usize,
    failed: bool,
}

impl<R: Read> TfRecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            index: 0,
            failed: false,
        }
    }

    fn corrupt(&self, what: &str) -> anyhow::Error {
        XShardsError::CorruptRecord(format!("record #{}: {what}", self.index)).into()
    }

    /// Fill `buf` completely; `Ok(false)` on EOF before the first byte.
    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => return Err(self.corrupt("truncated length header")),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let mut b = [0u8; 4];
        self.inner
            .read_exact(&mut b)
            .map_err(|_| self.corrupt(&format!("truncated {what}")))?;
        Ok(u32::from_le_bytes(b))
    }

    fn next_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut len_bytes = [0u8; 8];
        if !self.read_exact_or_eof(&mut len_bytes)? {
            return Ok(None);
        }
        if self.read_u32("length checksum")? != masked_crc(&len_bytes) {
            return Err(self.corrupt("length checksum mismatch"));
        }
        let len = usize::try_from(u64::from_le_bytes(len_bytes))
            .map_err(|_| self.corrupt("length overflows usize"))?;
        let mut data = Vec::new();
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut data)
            .with_context(|| format!("read TFRecord payload #{}", self.index))?;
        if data.len() != len {
            return Err(self.corrupt("truncated payload"));
        }
        if self.read_u32("data checksum")? != masked_crc(&data) {
            return Err(self.corrupt("data checksum mismatch"));
        }
        Ok(Some(data))
    }
}

impl<'a> TfRecordReader<Box<dyn BufRead + 'a>> {
    /// Open `path`, decompressing transparently.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        Ok(Self::new(auto_detect_reader(f, path)?))
    }
}

impl<R: Read> Iterator for TfRecordReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(Some(data)) => {
                self.index += 1;
                Some(Ok(data))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
