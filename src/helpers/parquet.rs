//! Parquet helpers (feature `io-parquet`).
//!
//! Only `columns` and `schema` of [`ReadOptions`] apply to Parquet: the file
//! carries its own names and types, so `header`, `names`, `usecols` and
//! `dtype` are ignored.

use super::common::{open_collection, write_partitions};
use crate::collection::ShardedCollection;
use crate::io::parquet::{write_parquet_batch, ParquetFormat};
use crate::options::ReadOptions;
use anyhow::Result;
use std::path::Path;

/// Read Parquet file(s) as a sharded collection, one partition per file.
///
/// ### Example
/// ```no_run
/// use xshards::*;
/// # fn main() -> anyhow::Result<()> {
/// let schema: Schema = [("sale_price", DType::Int64)].into_iter().collect();
/// let sales = read_parquet(
///     "data/sales.parquet",
///     ReadOptions::new().with_columns(["ID", "sale_price"]).with_schema(schema),
/// )?;
/// let shards = sales.collect()?;
/// assert_eq!(shards[0].dtype("sale_price"), Some(DType::Int64));
/// # Ok(()) }
/// ```
pub fn read_parquet(path: impl AsRef<Path>, options: ReadOptions) -> Result<ShardedCollection> {
    let format = ParquetFormat {
        columns: options.columns,
        schema: options.schema,
    };
    open_collection(path.as_ref(), format)
}

impl ShardedCollection {
    /// Write each partition to `dir/part-NNNNN.parquet`.
    ///
    /// Reading `dir` back yields the same number of partitions.
    pub fn write_parquet(&self, dir: impl AsRef<Path>) -> Result<usize> {
        write_partitions(self, dir.as_ref(), "parquet", |p, b| {
            write_parquet_batch(p, b)
        })
    }
}
