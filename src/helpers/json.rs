//! JSON helpers (feature `io-json`).

use super::common::{open_collection, write_partitions};
use crate::collection::ShardedCollection;
use crate::io::json::{write_json_batch, JsonFormat};
use crate::options::ReadOptions;
use anyhow::Result;
use std::path::Path;

/// Read JSON (lines or arrays of records) as a sharded collection, one
/// partition per file.
///
/// `header` and `delimiter` do not apply to JSON and are ignored.
pub fn read_json(path: impl AsRef<Path>, options: ReadOptions) -> Result<ShardedCollection> {
    open_collection(path.as_ref(), JsonFormat { options })
}

impl ShardedCollection {
    /// Write each partition to `dir/part-NNNNN.json` as JSON lines.
    pub fn write_json(&self, dir: impl AsRef<Path>) -> Result<usize> {
        write_partitions(self, dir.as_ref(), "json", |p, b| write_json_batch(p, b))
    }
}
