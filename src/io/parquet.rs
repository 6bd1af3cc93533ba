//! Parquet fragments via the `parquet` crate's Arrow reader and writer.
//!
//! Column projection is pushed down into the reader with a root-level
//! [`ProjectionMask`], then the batch is reordered to the requested order
//! (Parquet always yields file order). An explicit [`Schema`] is applied last
//! and wins over the types stored in the file.

use crate::error::XShardsError;
use crate::schema::Schema;
use crate::source::FragmentFormat;
use crate::table::{conform_to_schema, select_names};
use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::arrow::ProjectionMask;
use parquet::file::properties::WriterProperties;
use std::fs::{create_dir_all, File};
use std::path::Path;

const BATCH_SIZE: usize = 64 * 1024;

/// Read a whole Parquet file into one batch.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded,
/// [`XShardsError::UnknownColumn`] for a projected column the file lacks, or a
/// cast error when `schema` declares an incompatible type.
pub fn read_parquet_batch(
    path: impl AsRef<Path>,
    columns: Option<&[String]>,
    schema: Option<&Schema>,
) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("open Parquet reader for {}", path.display()))?
        .with_batch_size(BATCH_SIZE);

    let builder = match columns {
        Some(columns) => {
            let file_schema = builder.schema();
            let mut roots = Vec::with_capacity(columns.len());
            for name in columns {
                let idx = file_schema
                    .index_of(name)
                    .map_err(|_| XShardsError::UnknownColumn(name.clone()))?;
                roots.push(idx);
            }
            let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
            builder.with_projection(mask)
        }
        None => builder,
    };

    let reader = builder
        .build()
        .with_context(|| format!("build Parquet reader for {}", path.display()))?;
    let read_schema = reader.schema();
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("decode {}", path.display()))?;
    let mut batch = concat_batches(&read_schema, &batches).context("concatenate row groups")?;

    if let Some(columns) = columns {
        batch = select_names(&batch, columns)?;
    }
    if let Some(schema) = schema {
        batch = conform_to_schema(&batch, schema)?;
    }
    Ok(batch)
}

/// Write one batch to a Parquet file, creating parent directories as needed.
///
/// Zero-row batches are written too, so the schema survives a round trip.
pub fn write_parquet_batch(path: impl AsRef<Path>, batch: &RecordBatch) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let props = WriterProperties::builder().build();
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).context("create ArrowWriter")?;
    writer.write(batch).context("write batch to parquet")?;
    writer.close().context("close ArrowWriter")?;
    Ok(batch.num_rows())
}

/// [`FragmentFormat`] for Parquet files.
#[derive(Clone, Debug, Default)]
pub struct ParquetFormat {
    pub columns: Option<Vec<String>>,
    pub schema: Option<Schema>,
}

impl FragmentFormat for ParquetFormat {
    const NAME: &'static str = "parquet";

    fn read_fragment(&self, path: &Path) -> Result<RecordBatch> {
        read_parquet_batch(path, self.columns.as_deref(), self.schema.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::table::batch_from_columns;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::DataType;
    use std::sync::Arc;

    fn sample() -> RecordBatch {
        batch_from_columns(
            vec!["ID".into(), "sale_price".into(), "location".into()],
            vec![
                Arc::new(StringArray::from(vec!["a", "b"])),
                Arc::new(Int32Array::from(vec![10, 20])),
                Arc::new(StringArray::from(vec!["NY", "SF"])),
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn projection_follows_request_order() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let p = tmp.path().join("s.parquet");
        write_parquet_batch(&p, &sample())?;
        let cols = vec!["location".to_string(), "ID".to_string()];
        let b = read_parquet_batch(&p, Some(&cols), None)?;
        let names: Vec<_> = b.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, cols);
        assert_eq!(b.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn schema_widens_stored_type() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let p = tmp.path().join("s.parquet");
        write_parquet_batch(&p, &sample())?;
        let schema: Schema = [("sale_price", DType::Int64)].into_iter().collect();
        let b = read_parquet_batch(&p, None, Some(&schema))?;
        assert_eq!(b.schema().field(1).data_type(), &DataType::Int64);
        Ok(())
    }

    #[test]
    fn unknown_projection_is_typed() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let p = tmp.path().join("s.parquet");
        write_parquet_batch(&p, &sample())?;
        let err = read_parquet_batch(&p, Some(&["nope".to_string()]), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<XShardsError>(),
            Some(XShardsError::UnknownColumn(c)) if c == "nope"
        ));
        Ok(())
    }
}
