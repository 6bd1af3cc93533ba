//! CSV fragments: one file in, one `RecordBatch` out.
//!
//! Parsing is done by the `csv` crate into text cells; each column is then typed
//! by the configured [`TypeInference`](crate::schema::TypeInference) strategy
//! and built into an Arrow array. The remaining [`ReadOptions`] (`names`,
//! `usecols`, `dtype`) are applied afterwards.
//!
//! # Design notes
//! - Empty cells are nulls.
//! - Ragged rows are an error (the reader is not `flexible`).
//! - With `header = Infer`, a file that only holds a header yields zero rows
//!   with every column typed `str`.

use crate::dtype::{parse_column, DType};
use crate::io::compression::{auto_detect_reader, auto_detect_writer};
use crate::options::{Header, ReadOptions};
use crate::source::FragmentFormat;
use crate::table::{apply_text_options, batch_from_columns};
use anyhow::{Context, Result};
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::{create_dir_all, File};
use std::path::Path;

/// Parse one CSV file according to `opts`.
///
/// **Compression**: gzip, zstd, bzip2 and xz inputs are decompressed
/// transparently (by extension or magic bytes).
///
/// # Errors
/// Returns an error if the file cannot be opened, a record is malformed, a
/// column does not parse as its inferred type, or an option does not fit the
/// parsed columns.
pub fn read_csv_batch(path: impl AsRef<Path>, opts: &ReadOptions) -> Result<RecordBatch> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(opts.delimiter)
        .from_reader(rdr);

    let mut records = rdr.records().enumerate();
    let mut names: Option<Vec<String>> = None;
    if opts.header == Header::Infer {
        if let Some((_, head)) = records.next() {
            let head = head.with_context(|| format!("parse CSV header of {}", path.display()))?;
            names = Some(head.iter().map(str::to_string).collect());
        }
    }

    let mut rows: Vec<StringRecord> = Vec::new();
    for (i, rec) in records {
        rows.push(rec.with_context(|| format!("parse CSV record #{} in {}", i + 1, path.display()))?);
    }

    let names = names.unwrap_or_else(|| {
        let width = rows.first().map_or(0, StringRecord::len);
        (0..width).map(|i| i.to_string()).collect()
    });

    let columns = build_columns(&names, &rows, opts)?;
    let batch = batch_from_columns(names, columns, rows.len())?;
    apply_text_options(batch, opts)
}

fn build_columns(names: &[String], rows: &[StringRecord], opts: &ReadOptions) -> Result<Vec<ArrayRef>> {
    let inference = opts.type_inference();
    let sample = opts.infer_rows.unwrap_or(rows.len()).min(rows.len());
    names
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let cells: Vec<Option<&str>> = rows
                .iter()
                .map(|r| r.get(c).filter(|s| !s.is_empty()))
                .collect();
            let dtype = if rows.is_empty() {
                DType::Utf8
            } else {
                inference.infer(&cells[..sample])
            };
            parse_column(name, &cells, dtype)
        })
        .collect()
}

/// Write one batch as a CSV file, creating parent directories as needed.
///
/// **Compression**: chosen from the output extension (e.g. `.csv.gz`).
///
/// # Returns
/// The number of rows written.
pub fn write_csv_batch(path: impl AsRef<Path>, batch: &RecordBatch, has_headers: bool) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))?;
    let mut wtr = WriterBuilder::new().from_writer(w);

    let schema = batch.schema();
    if has_headers {
        wtr.write_record(schema.fields().iter().map(|f| f.name().as_str()))
            .context("write CSV header")?;
    }
    let fmt_opts = FormatOptions::default();
    let formatters = batch
        .columns()
        .iter()
        .map(|c| ArrayFormatter::try_new(c.as_ref(), &fmt_opts))
        .collect::<Result<Vec<_>, _>>()
        .context("prepare CSV formatters")?;
    for row in 0..batch.num_rows() {
        let cells: Vec<String> = formatters.iter().map(|f| f.value(row).to_string()).collect();
        wtr.write_record(&cells)
            .with_context(|| format!("write CSV row #{}", row + 1))?;
    }
    let inner = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush CSV writer: {}", e.error()))?;
    inner
        .finish()
        .with_context(|| format!("finish {}", path.display()))?;
    Ok(batch.num_rows())
}

/// [`FragmentFormat`] for CSV files.
#[derive(Clone, Debug)]
pub struct CsvFormat {
    pub options: ReadOptions,
}

impl FragmentFormat for CsvFormat {
    const NAME: &'static str = "csv";

    fn read_fragment(&self, path: &Path) -> Result<RecordBatch> {
        read_csv_batch(path, &self.options)
    }
}
