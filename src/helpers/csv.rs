//! CSV helpers (feature `io-csv`).

use super::common::{open_collection, write_partitions};
use crate::collection::ShardedCollection;
use crate::io::csv::{write_csv_batch, CsvFormat};
use crate::options::ReadOptions;
use anyhow::Result;
use std::path::Path;

/// Read a CSV file, directory or glob as a sharded collection, one partition
/// per file.
///
/// The path is resolved immediately; files are parsed when the collection is
/// collected.
///
/// ### Example
/// ```no_run
/// use xshards::*;
/// # fn main() -> anyhow::Result<()> {
/// let sales = read_csv(
///     "data/sales",
///     ReadOptions::new()
///         .with_header(Header::None)
///         .with_names(["ID", "sale_price", "location"]),
/// )?;
/// assert!(sales.collect()?[0].contains_column("sale_price"));
/// # Ok(()) }
/// ```
///
/// # Errors
/// [`XShardsError::PathNotFound`](crate::XShardsError::PathNotFound) when
/// `path` resolves to nothing.
pub fn read_csv(path: impl AsRef<Path>, options: ReadOptions) -> Result<ShardedCollection> {
    open_collection(path.as_ref(), CsvFormat { options })
}

impl ShardedCollection {
    /// Write each partition to `dir/part-NNNNN.csv` with a header row.
    ///
    /// Returns the number of rows written.
    pub fn write_csv(&self, dir: impl AsRef<Path>) -> Result<usize> {
        write_partitions(self, dir.as_ref(), "csv", |p, b| write_csv_batch(p, b, true))
    }
}
