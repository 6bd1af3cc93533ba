//! Execution of per-partition work.
//!
//! The runner reads every partition of a [`ShardSource`] and pushes it through
//! the collection's fused shard transforms. Partitions are independent, so the
//! parallel mode simply fans them out over rayon; results are always returned
//! in partition index order.

use crate::shard::Shard;
use crate::source::ShardSource;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::Arc;

/// A shard-to-shard transform applied inside each partition job.
pub type ShardFn = Arc<dyn Fn(Shard) -> Result<Shard> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// One partition after another on the calling thread.
    Sequential,
    /// Partitions in parallel; `threads: None` uses the global rayon pool.
    Parallel { threads: Option<usize> },
}

impl Default for ExecMode {
    fn default() -> Self {
        ExecMode::Parallel { threads: None }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Runner {
    pub mode: ExecMode,
}

impl Runner {
    pub fn new(mode: ExecMode) -> Self {
        Self { mode }
    }

    /// Materialize every partition of `source` through `stages`.
    ///
    /// # Errors
    /// The first failing partition aborts the run; its error is returned with
    /// the partition index attached.
    pub fn run(&self, source: &dyn ShardSource, stages: &[ShardFn]) -> Result<Vec<Shard>> {
        let n = source.num_partitions();
        tracing::debug!(kind = source.kind(), partitions = n, mode = ?self.mode, "collect");
        match self.mode {
            ExecMode::Sequential => (0..n).map(|i| run_partition(source, stages, i)).collect(),
            ExecMode::Parallel { threads: None } => run_par(source, stages, n),
            ExecMode::Parallel { threads: Some(t) } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(t.max(1))
                    .build()
                    .context("build rayon thread pool")?;
                pool.install(|| run_par(source, stages, n))
            }
        }
    }
}

fn run_par(source: &dyn ShardSource, stages: &[ShardFn], n: usize) -> Result<Vec<Shard>> {
    // indexed collect keeps partition order
    (0..n)
        .into_par_iter()
        .map(|i| run_partition(source, stages, i))
        .collect()
}

/// Read one partition and fold it through the fused stages.
fn run_partition(source: &dyn ShardSource, stages: &[ShardFn], index: usize) -> Result<Shard> {
    let shard = Shard::new(source.read_partition(index)?);
    stages
        .iter()
        .try_fold(shard, |acc, f| f(acc))
        .with_context(|| format!("transform partition {index}"))
}
