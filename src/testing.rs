//! Fixture builders for tests and doc examples.
//!
//! Each builder lays a small dataset out under a caller-supplied root
//! (usually a `tempfile::tempdir()`) and returns the path to read:
//!
//! ```no_run
//! use xshards::testing::*;
//! use xshards::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let tmp = tempfile::tempdir()?;
//! let sales = read_csv(write_sales_csv_dir(tmp.path())?, ReadOptions::default())?;
//! assert_eq!(sales.num_partitions(), 2);
//! assert_columns(&sales.collect()?[0], &["ID", "sale_price", "location"]);
//! # Ok(()) }
//! ```

use crate::shard::Shard;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Data rows in the file written by [`write_large_csv`].
pub const LARGE_CSV_ROWS: usize = 10_009;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    #[serde(rename = "ID")]
    pub id: i64,
    pub sale_price: f64,
    pub location: String,
}

#[must_use]
pub fn sample_sales() -> Vec<SaleRecord> {
    [
        (100, 100.5, "NY"),
        (101, 125.5, "SF"),
        (102, 98.25, "LA"),
        (103, 310.5, "NY"),
        (104, 47.25, "SEA"),
    ]
    .into_iter()
    .map(|(id, sale_price, location)| SaleRecord {
        id,
        sale_price,
        location: location.to_string(),
    })
    .collect()
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn sales_csv(rows: &[SaleRecord], header: bool) -> String {
    let mut out = String::new();
    if header {
        out.push_str("ID,sale_price,location\n");
    }
    for r in rows {
        out.push_str(&format!("{},{},{}\n", r.id, r.sale_price, r.location));
    }
    out
}

/// `root/csv/` holding two headed CSV files (three and two sales).
pub fn write_sales_csv_dir(root: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = root.as_ref().join("csv");
    let sales = sample_sales();
    write_file(&dir.join("sales-0.csv"), &sales_csv(&sales[..3], true))?;
    write_file(&dir.join("sales-1.csv"), &sales_csv(&sales[3..], true))?;
    Ok(dir)
}

/// `root/no_header.csv`: the sample sales without a header row.
pub fn write_no_header_csv(root: impl AsRef<Path>) -> Result<PathBuf> {
    let path = root.as_ref().join("no_header.csv");
    write_file(&path, &sales_csv(&sample_sales(), false))?;
    Ok(path)
}

/// `root/json/` holding two JSON files with `timestamp` and integer `value`
/// fields: one in JSON-lines layout, one as an array.
pub fn write_json_dir(root: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = root.as_ref().join("json");
    write_file(
        &dir.join("part-0.json"),
        "{\"timestamp\": \"2019-01-01 00:00:00\", \"value\": 1}\n\
         {\"timestamp\": \"2019-01-01 00:01:00\", \"value\": 2}\n",
    )?;
    write_file(
        &dir.join("part-1.json"),
        "[{\"timestamp\": \"2019-01-01 00:02:00\", \"value\": 3},\n \
         {\"timestamp\": \"2019-01-01 00:03:00\", \"value\": 4}]\n",
    )?;
    Ok(dir)
}

/// `root/10010.csv`: a header plus [`LARGE_CSV_ROWS`] records.
pub fn write_large_csv(root: impl AsRef<Path>) -> Result<PathBuf> {
    let path = root.as_ref().join("10010.csv");
    let f = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    writeln!(w, "ID,sale_price,location")?;
    for i in 0..LARGE_CSV_ROWS {
        writeln!(w, "{},{}.5,loc{}", i, i % 1000, i % 7)?;
    }
    w.flush()?;
    Ok(path)
}

/// Fake JPEG payload: the SOI/EOI markers around a few distinguishing bytes.
fn fake_jpeg(seed: u8) -> Vec<u8> {
    let mut v = vec![0xff, 0xd8, 0xff, 0xe0];
    v.extend((0..16).map(|i| seed.wrapping_mul(31).wrapping_add(i)));
    v.extend([0xff, 0xd9]);
    v
}

/// `root/imagenet/` in the raw layout [`write_tfrecord`](crate::write_tfrecord)
/// expects: two training synsets with two images each and a one-image
/// validation split.
pub fn write_imagenet_layout(root: impl AsRef<Path>) -> Result<PathBuf> {
    let base = root.as_ref().join("imagenet");
    let images = [
        ("train", "n01440764", "n01440764_10026.JPEG"),
        ("train", "n01440764", "n01440764_10027.JPEG"),
        ("train", "n02102040", "n02102040_1082.JPEG"),
        ("train", "n02102040", "n02102040_1083.JPEG"),
        ("validation", "n02102040", "ILSVRC2012_val_00000001.JPEG"),
    ];
    for (i, (split, synset, name)) in images.into_iter().enumerate() {
        let dir = base.join(split).join(synset);
        fs::create_dir_all(&dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
        fs::write(dir.join(name), fake_jpeg(i as u8))?;
    }
    Ok(base)
}

/// Assert that `shard` has exactly `expected` columns, in order.
///
/// # Panics
/// When the column lists differ.
pub fn assert_columns(shard: &Shard, expected: &[&str]) {
    let actual = shard.columns();
    assert_eq!(
        actual, expected,
        "column mismatch:\n  actual:   {actual:?}\n  expected: {expected:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_dir_has_two_files() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = write_sales_csv_dir(tmp.path())?;
        assert_eq!(fs::read_dir(dir)?.count(), 2);
        Ok(())
    }

    #[test]
    fn large_csv_line_count() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let text = fs::read_to_string(write_large_csv(tmp.path())?)?;
        assert_eq!(text.lines().count(), LARGE_CSV_ROWS + 1);
        Ok(())
    }
}
