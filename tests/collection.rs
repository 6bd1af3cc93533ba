use anyhow::Result;
use xshards::testing::{sample_sales, SaleRecord};
use xshards::*;

fn sales_in(parts: &[usize]) -> Result<ShardedCollection> {
    let all = sample_sales();
    let mut shards = Vec::new();
    let mut start = 0;
    for &n in parts {
        shards.push(Shard::from_rows(&all[start..start + n])?);
        start += n;
    }
    Ok(ShardedCollection::from_shards(shards))
}

#[test]
fn execution_modes_agree() -> Result<()> {
    let c = sales_in(&[2, 1, 2])?;
    let seq = c.collect_seq()?;
    assert_eq!(c.collect_par(Some(3))?, seq);
    assert_eq!(c.collect_par(None)?, seq);
    assert_eq!(c.collect()?, seq);
    Ok(())
}

#[test]
fn transform_shard_runs_per_partition() -> Result<()> {
    let c = sales_in(&[3, 2])?;
    let first_only = c.transform_shard(|s| {
        let b = s.batch().slice(0, 1);
        Ok(Shard::new(b))
    });
    assert_eq!(first_only.num_partitions(), 2);
    let rows: Vec<SaleRecord> = first_only.collect_rows()?;
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![100, 103]);
    assert_eq!(c.len()?, 5);
    Ok(())
}

#[test]
fn transform_errors_surface_on_collect() -> Result<()> {
    let c = sales_in(&[1, 1])?.transform_shard(|_| anyhow::bail!("bad shard"));
    let err = c.collect().unwrap_err();
    assert!(format!("{err:#}").contains("bad shard"));
    Ok(())
}

#[test]
fn repartition_preserves_rows_in_order() -> Result<()> {
    let c = sales_in(&[4, 1])?;
    let r = c.repartition(2)?;
    assert_eq!(r.num_partitions(), 2);
    let rows: Vec<SaleRecord> = r.collect_rows()?;
    assert_eq!(rows, sample_sales());
    Ok(())
}

#[test]
fn empty_collection() -> Result<()> {
    let c = ShardedCollection::from_shards(Vec::new());
    assert_eq!(c.num_partitions(), 0);
    assert!(c.collect()?.is_empty());
    assert!(c.is_empty()?);
    Ok(())
}
