//! Partition sources behind a [`ShardedCollection`](crate::ShardedCollection).
//!
//! A [`ShardSource`] knows how many partitions it has without reading them and
//! can materialize any single partition on demand. The runner drives sources
//! through this trait only, so file-backed and in-memory collections execute
//! the same way.
//!
//! File-backed sources pair a list of fragments (one data file each) with a
//! [`FragmentFormat`] that turns one file into one `RecordBatch`.

use anyhow::{anyhow, Context, Result};
use arrow::record_batch::RecordBatch;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub trait ShardSource: Send + Sync + Debug {
    /// Number of partitions, known without reading data.
    fn num_partitions(&self) -> usize;

    /// Materialize partition `index` (`0..num_partitions()`).
    fn read_partition(&self, index: usize) -> Result<RecordBatch>;

    /// Short label for logs (`"csv"`, `"memory"`, ...).
    fn kind(&self) -> &'static str;
}

/// Decodes one data file into one partition.
pub trait FragmentFormat: Send + Sync + Debug {
    const NAME: &'static str;

    fn read_fragment(&self, path: &Path) -> Result<RecordBatch>;
}

#[derive(Debug)]
pub struct FileSource<F> {
    fragments: Vec<PathBuf>,
    format: F,
}

impl<F: FragmentFormat> FileSource<F> {
    pub fn new(fragments: Vec<PathBuf>, format: F) -> Self {
        Self { fragments, format }
    }

    pub fn fragments(&self) -> &[PathBuf] {
        &self.fragments
    }
}

impl<F: FragmentFormat> ShardSource for FileSource<F> {
    fn num_partitions(&self) -> usize {
        self.fragments.len()
    }

    fn read_partition(&self, index: usize) -> Result<RecordBatch> {
        let path = self
            .fragments
            .get(index)
            .ok_or_else(|| anyhow!("partition {index} out of range ({} fragments)", self.fragments.len()))?;
        tracing::trace!(format = F::NAME, partition = index, path = %path.display(), "read fragment");
        self.format
            .read_fragment(path)
            .with_context(|| format!("read {} fragment {}", F::NAME, path.display()))
    }

    fn kind(&self) -> &'static str {
        F::NAME
    }
}

/// Partitions already held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    batches: Vec<RecordBatch>,
}

impl MemorySource {
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }
}

impl ShardSource for MemorySource {
    fn num_partitions(&self) -> usize {
        self.batches.len()
    }

    fn read_partition(&self, index: usize) -> Result<RecordBatch> {
        self.batches
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("partition {index} out of range ({} partitions)", self.batches.len()))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
