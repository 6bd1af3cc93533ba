//! [`ShardedCollection`]: the immutable, lazily evaluated sharded table.
//!
//! A collection is a partition source plus a list of pending shard transforms.
//! Nothing is read until a terminal call (`collect*`, `len`, `collect_rows`,
//! `write_*`). Deriving calls (`transform_shard`, `repartition`) return a new
//! collection and never touch the receiver.

use crate::runner::{ExecMode, Runner, ShardFn};
use crate::shard::Shard;
use crate::source::{MemorySource, ShardSource};
use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct ShardedCollection {
    source: Arc<dyn ShardSource>,
    stages: Vec<ShardFn>,
}

impl fmt::Debug for ShardedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCollection")
            .field("source", &self.source)
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl ShardedCollection {
    pub fn from_source(source: Arc<dyn ShardSource>) -> Self {
        Self {
            source,
            stages: Vec::new(),
        }
    }

    /// A collection over shards already in memory, one partition each.
    pub fn from_shards(shards: Vec<Shard>) -> Self {
        let batches = shards.into_iter().map(Shard::into_batch).collect();
        Self::from_source(Arc::new(MemorySource::new(batches)))
    }

    /// Number of partitions. Does not read any data.
    pub fn num_partitions(&self) -> usize {
        self.source.num_partitions()
    }

    /// Materialize every partition, in partition order, using the default
    /// (parallel) runner.
    ///
    /// # Errors
    /// Any read or transform failure in any partition.
    pub fn collect(&self) -> Result<Vec<Shard>> {
        Runner::default().run(self.source.as_ref(), &self.stages)
    }

    /// [`collect`](Self::collect) on the calling thread only.
    pub fn collect_seq(&self) -> Result<Vec<Shard>> {
        Runner::new(ExecMode::Sequential).run(self.source.as_ref(), &self.stages)
    }

    /// [`collect`](Self::collect) on a dedicated pool of `threads` workers
    /// (`None` = global rayon pool).
    pub fn collect_par(&self, threads: Option<usize>) -> Result<Vec<Shard>> {
        Runner::new(ExecMode::Parallel { threads }).run(self.source.as_ref(), &self.stages)
    }

    /// Total number of records across all partitions.
    pub fn len(&self) -> Result<usize> {
        Ok(self.collect()?.iter().map(Shard::len).sum())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Deserialize every record of every partition into `T`, partition by
    /// partition.
    pub fn collect_rows<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for (i, shard) in self.collect()?.iter().enumerate() {
            let mut rows = shard
                .to_rows::<T>()
                .with_context(|| format!("rows of partition {i}"))?;
            out.append(&mut rows);
        }
        Ok(out)
    }

    /// Lazily apply `f` to every partition.
    ///
    /// The transform runs inside the partition job, after the read and after
    /// previously added transforms.
    #[must_use]
    pub fn transform_shard<F>(&self, f: F) -> Self
    where
        F: Fn(Shard) -> Result<Shard> + Send + Sync + 'static,
    {
        let mut stages = self.stages.clone();
        stages.push(Arc::new(f));
        Self {
            source: Arc::clone(&self.source),
            stages,
        }
    }

    /// Materialize and redistribute all records into exactly `n` contiguous
    /// partitions whose sizes differ by at most one.
    ///
    /// Fewer than `n` partitions are produced only when there are fewer
    /// records; an empty collection becomes one empty partition (if it had a
    /// schema).
    ///
    /// # Errors
    /// Fails if collecting fails or the partitions do not share a schema.
    pub fn repartition(&self, n: usize) -> Result<Self> {
        let shards = self.collect()?;
        let Some(first) = shards.first() else {
            return Ok(Self::from_shards(Vec::new()));
        };
        let schema = first.schema();
        let batches: Vec<RecordBatch> = shards.into_iter().map(Shard::into_batch).collect();
        let all = concat_batches(&schema, &batches).context("concatenate partitions")?;
        let total = all.num_rows();
        let parts = n.max(1).min(total.max(1));

        // partition i holds rows [i*total/parts, (i+1)*total/parts)
        let out: Vec<Shard> = (0..parts)
            .map(|i| {
                let start = i * total / parts;
                let end = (i + 1) * total / parts;
                Shard::new(all.slice(start, end - start))
            })
            .collect();
        tracing::debug!(from = self.num_partitions(), to = out.len(), rows = total, "repartition");
        Ok(Self::from_shards(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::batch_from_columns;
    use arrow::array::{Array, Int64Array};

    fn ints(vals: Vec<i64>) -> Shard {
        Shard::new(
            batch_from_columns(
                vec!["v".into()],
                vec![Arc::new(Int64Array::from(vals.clone()))],
                vals.len(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn repartition_spreads_rows() -> Result<()> {
        let c = ShardedCollection::from_shards(vec![ints(vec![1, 2, 3, 4, 5]), ints(vec![6, 7])]);
        let r = c.repartition(3)?;
        assert_eq!(r.num_partitions(), 3);
        let sizes: Vec<usize> = r.collect()?.iter().map(Shard::len).collect();
        assert_eq!(sizes, vec![2, 2, 3]);
        assert_eq!(c.num_partitions(), 2);
        Ok(())
    }

    #[test]
    fn repartition_hits_requested_count_when_uneven() -> Result<()> {
        let four = ShardedCollection::from_shards(vec![ints(vec![1, 2, 3, 4])]);
        let r = four.repartition(3)?;
        assert_eq!(r.num_partitions(), 3);
        assert_eq!(r.len()?, 4);

        let seven = ShardedCollection::from_shards(vec![ints((1..=7).collect())]);
        let r = seven.repartition(5)?;
        assert_eq!(r.num_partitions(), 5);
        let sizes: Vec<usize> = r.collect()?.iter().map(Shard::len).collect();
        assert_eq!(sizes, vec![1, 1, 2, 1, 2]);
        assert!(sizes.iter().all(|&s| s > 0));

        let rows: Vec<i64> = r
            .collect()?
            .iter()
            .flat_map(|s| {
                s.batch()
                    .column(0)
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .unwrap()
                    .values()
                    .to_vec()
            })
            .collect();
        assert_eq!(rows, (1..=7).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn repartition_never_exceeds_rows() -> Result<()> {
        let c = ShardedCollection::from_shards(vec![ints(vec![1, 2])]);
        assert_eq!(c.repartition(10)?.num_partitions(), 2);
        assert_eq!(c.repartition(0)?.num_partitions(), 1);
        Ok(())
    }

    #[test]
    fn transform_is_lazy_and_ordered() -> Result<()> {
        let c = ShardedCollection::from_shards(vec![ints(vec![1]), ints(vec![2, 3])]);
        let t = c
            .transform_shard(|s| Ok(Shard::new(s.batch().slice(0, 1))))
            .transform_shard(|s| Ok(s));
        assert_eq!(t.len()?, 2);
        assert_eq!(c.len()?, 3);
        Ok(())
    }
}
