//! JSON fragments: line-delimited records or a top-level array of records.
//!
//! Columns are the union of record keys in first-seen order. Element types
//! come from the JSON values themselves:
//!
//! - only booleans -> `bool`
//! - only integers (fitting `i64`) -> `int64`
//! - any number mix -> `float64`
//! - anything else -> `str` (strings verbatim, other values as compact JSON)
//!
//! Missing keys and `null` are nulls. `names`, `usecols` and `dtype` are applied
//! after parsing, as for CSV.

use crate::io::compression::{auto_detect_reader, auto_detect_writer};
use crate::options::ReadOptions;
use crate::source::FragmentFormat;
use crate::error::XShardsError;
use crate::table::{apply_text_options, batch_from_columns};
use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::json::LineDelimitedWriter;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, Read};
use std::path::Path;
use std::sync::Arc;

/// Read every record of a JSON file.
///
/// The layout is chosen from the first non-whitespace byte: `[` means one JSON
/// array of objects, anything else means one object per line (blank lines are
/// skipped).
///
/// # Errors
/// Returns an error if the file cannot be read, a line/array fails to parse, or
/// a record is not a JSON object.
pub fn read_json_records(path: impl AsRef<Path>) -> Result<Vec<Map<String, Value>>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;

    let values: Vec<Value> = if starts_with_array(&mut rdr)? {
        let mut text = String::new();
        rdr.read_to_string(&mut text)
            .with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parse JSON array in {}", path.display()))?
    } else {
        let mut out = Vec::new();
        for (i, line) in rdr.lines().enumerate() {
            let line = line.with_context(|| format!("read line {} in {}", i + 1, path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let v: Value = serde_json::from_str(&line).with_context(|| {
                format!("parse JSON line {} in {}: {}", i + 1, path.display(), line)
            })?;
            out.push(v);
        }
        out
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Object(m) => Ok(m),
            other => Err(XShardsError::SchemaMismatch(format!(
                "JSON record #{} in {} is not an object: {}",
                i + 1,
                path.display(),
                other
            ))
            .into()),
        })
        .collect()
}

fn starts_with_array(rdr: &mut dyn BufRead) -> Result<bool> {
    loop {
        let buf = rdr.fill_buf().context("peek JSON input")?;
        if buf.is_empty() {
            return Ok(false);
        }
        let ws = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if ws < buf.len() {
            let first = buf[ws];
            rdr.consume(ws);
            return Ok(first == b'[');
        }
        rdr.consume(ws);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum JsonKind {
    Bool,
    Int,
    Float,
    Text,
}

fn kind_of(v: &Value) -> JsonKind {
    match v {
        Value::Bool(_) => JsonKind::Bool,
        Value::Number(n) if n.is_i64() => JsonKind::Int,
        Value::Number(_) => JsonKind::Float,
        _ => JsonKind::Text,
    }
}

fn merge(a: JsonKind, b: JsonKind) -> JsonKind {
    use JsonKind::*;
    match (a, b) {
        (x, y) if x == y => x,
        (Int, Float) | (Float, Int) => Float,
        _ => Text,
    }
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn build_column(cells: &[Option<&Value>]) -> ArrayRef {
    let kind = cells
        .iter()
        .flatten()
        .map(|v| kind_of(v))
        .reduce(merge)
        .unwrap_or(JsonKind::Text);
    match kind {
        JsonKind::Bool => Arc::new(BooleanArray::from(
            cells.iter().map(|c| c.and_then(Value::as_bool)).collect::<Vec<_>>(),
        )),
        JsonKind::Int => Arc::new(Int64Array::from(
            cells.iter().map(|c| c.and_then(Value::as_i64)).collect::<Vec<_>>(),
        )),
        JsonKind::Float => Arc::new(Float64Array::from(
            cells.iter().map(|c| c.and_then(Value::as_f64)).collect::<Vec<_>>(),
        )),
        JsonKind::Text => Arc::new(StringArray::from(
            cells.iter().map(|c| c.map(text_of)).collect::<Vec<_>>(),
        )),
    }
}

/// Parse one JSON file into a batch according to `opts`.
pub fn read_json_batch(path: impl AsRef<Path>, opts: &ReadOptions) -> Result<RecordBatch> {
    let records = read_json_records(path)?;

    let mut names: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for rec in &records {
        for key in rec.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
    }

    let columns: Vec<ArrayRef> = names
        .iter()
        .map(|name| {
            let cells: Vec<Option<&Value>> = records
                .iter()
                .map(|r| r.get(name).filter(|v| !v.is_null()))
                .collect();
            build_column(&cells)
        })
        .collect();

    let batch = batch_from_columns(names, columns, records.len())?;
    apply_text_options(batch, opts)
}

/// Write one batch as JSON lines, creating parent directories as needed.
///
/// Null cells are omitted from their record.
///
/// # Returns
/// The number of records written.
pub fn write_json_batch(path: impl AsRef<Path>, batch: &RecordBatch) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))?;
    let mut writer = LineDelimitedWriter::new(w);
    writer
        .write(batch)
        .with_context(|| format!("serialize batch to {}", path.display()))?;
    writer.finish().context("finish JSON writer")?;
    writer
        .into_inner()
        .finish()
        .with_context(|| format!("finish {}", path.display()))?;
    Ok(batch.num_rows())
}

/// [`FragmentFormat`] for JSON files.
#[derive(Clone, Debug)]
pub struct JsonFormat {
    pub options: ReadOptions,
}

impl FragmentFormat for JsonFormat {
    const NAME: &'static str = "json";

    fn read_fragment(&self, path: &Path) -> Result<RecordBatch> {
        read_json_batch(path, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use arrow::datatypes::DataType;
    use std::fs;

    #[test]
    fn lines_and_arrays_agree() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let lines = tmp.path().join("a.json");
        let array = tmp.path().join("b.json");
        fs::write(&lines, "{\"t\": \"x\", \"v\": 1}\n\n{\"t\": \"y\", \"v\": 2.5}\n")?;
        fs::write(&array, "  \n[{\"t\": \"x\", \"v\": 1}, {\"t\": \"y\", \"v\": 2.5}]")?;
        let a = read_json_batch(&lines, &ReadOptions::default())?;
        let b = read_json_batch(&array, &ReadOptions::default())?;
        assert_eq!(a, b);
        assert_eq!(a.schema().field(1).data_type(), &DataType::Float64);
        Ok(())
    }

    #[test]
    fn keys_union_in_first_seen_order() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let p = tmp.path().join("u.json");
        fs::write(&p, "{\"b\": true}\n{\"a\": 3, \"b\": null}\n")?;
        let batch = read_json_batch(&p, &ReadOptions::default())?;
        let names: Vec<_> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Boolean);
        assert_eq!(batch.column(1).null_count(), 1);
        Ok(())
    }

    #[test]
    fn non_object_record_is_rejected() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let p = tmp.path().join("bad.json");
        fs::write(&p, "[1, 2]")?;
        let err = read_json_batch(&p, &ReadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("is not an object"));
        Ok(())
    }

    #[test]
    fn mixed_values_become_text() {
        let a = Value::from(1);
        let b = Value::from("x");
        let col = build_column(&[Some(&a), Some(&b), None]);
        assert_eq!(col.data_type(), &DataType::Utf8);
    }
}
