use crate::collection::ShardedCollection;
use crate::io::glob::resolve_fragments;
use crate::source::{FileSource, FragmentFormat};
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use std::fs::{create_dir_all, read_dir, remove_file};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolve `path` eagerly and wrap the fragments in a lazy collection.
pub(crate) fn open_collection<F>(path: &Path, format: F) -> Result<ShardedCollection>
where
    F: FragmentFormat + 'static,
{
    let fragments = resolve_fragments(path)?;
    tracing::debug!(
        format = F::NAME,
        path = %path.display(),
        partitions = fragments.len(),
        "open sharded collection"
    );
    Ok(ShardedCollection::from_source(Arc::new(FileSource::new(fragments, format))))
}

/// `dir/part-00000.<ext>`
pub(crate) fn part_path(dir: &Path, index: usize, ext: &str) -> PathBuf {
    dir.join(format!("part-{index:05}.{ext}"))
}

/// Delete the `part-*` files a previous write left in `dir`. Other entries are
/// kept.
fn clear_stale_parts(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        let is_part = entry.file_name().to_string_lossy().starts_with("part-");
        if is_part && entry.file_type()?.is_file() {
            let path = entry.path();
            remove_file(&path).with_context(|| format!("remove stale {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Materialize `collection` and write every partition to its own part file in
/// `dir`, in parallel. Part files from an earlier write to `dir` are replaced,
/// so the directory reads back with this collection's partition count.
/// Returns the total number of rows written.
pub(crate) fn write_partitions<W>(
    collection: &ShardedCollection,
    dir: &Path,
    ext: &str,
    write: W,
) -> Result<usize>
where
    W: Fn(&Path, &RecordBatch) -> Result<usize> + Send + Sync,
{
    let shards = collection.collect()?;
    create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
    let stale = clear_stale_parts(dir)?;
    if stale > 0 {
        tracing::debug!(dir = %dir.display(), stale, "removed old part files");
    }
    let written = shards
        .par_iter()
        .enumerate()
        .map(|(i, shard)| {
            let path = part_path(dir, i, ext);
            write(&path, shard.batch()).with_context(|| format!("write {}", path.display()))
        })
        .collect::<Result<Vec<usize>>>()?;
    let rows: usize = written.iter().sum();
    tracing::debug!(dir = %dir.display(), parts = written.len(), rows, "wrote partitions");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_names_are_zero_padded() {
        let p = part_path(Path::new("out"), 7, "csv.gz");
        assert_eq!(p, Path::new("out").join("part-00007.csv.gz"));
    }

    #[test]
    fn stale_parts_are_cleared_and_others_kept() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        std::fs::write(tmp.path().join("part-00003.json"), "{}\n")?;
        std::fs::write(tmp.path().join("README"), "keep")?;
        assert_eq!(clear_stale_parts(tmp.path())?, 1);
        assert!(tmp.path().join("README").is_file());
        assert!(!tmp.path().join("part-00003.json").exists());
        Ok(())
    }
}
