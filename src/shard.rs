//! The materialized form of one partition.

use crate::dtype::DType;
use anyhow::{Context, Result};
use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, FieldRef, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};
use serde_arrow::{from_record_batch, to_record_batch};

/// One partition of a [`ShardedCollection`](crate::ShardedCollection): an
/// in-memory table with named, typed columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Shard {
    batch: RecordBatch,
}

impl Shard {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Build a shard from typed rows; the Arrow schema is traced from `T`.
    ///
    /// # Errors
    /// Fails when `T` cannot be mapped to Arrow by `serde_arrow`.
    pub fn from_rows<T: Serialize + Deserialize<'static>>(rows: &[T]) -> Result<Self> {
        let fields: Vec<FieldRef> = Vec::<FieldRef>::from_type::<T>(TracingOptions::default())
            .context("infer Arrow schema from row type")?;
        let batch = to_record_batch(&fields, &rows).context("convert rows to RecordBatch")?;
        Ok(Self { batch })
    }

    /// Deserialize every record into `T`.
    ///
    /// # Errors
    /// Fails when a column does not match the corresponding field of `T`.
    pub fn to_rows<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        from_record_batch(&self.batch).context("deserialize RecordBatch rows")
    }

    /// Column names in schema order.
    pub fn columns(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Arrow element type of a column.
    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.column(name).map(|c| c.data_type().clone())
    }

    /// Element type of a column as a [`DType`], when it is one.
    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.column(name).and_then(|c| DType::from_arrow(c.data_type()))
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}

impl From<RecordBatch> for Shard {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sale {
        id: String,
        sale_price: i64,
    }

    #[test]
    fn rows_round_trip() {
        let rows = vec![
            Sale { id: "a".into(), sale_price: 10 },
            Sale { id: "b".into(), sale_price: 20 },
        ];
        let shard = Shard::from_rows(&rows).unwrap();
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.columns(), vec!["id", "sale_price"]);
        assert_eq!(shard.dtype("sale_price"), Some(DType::Int64));
        assert!(shard.contains_column("id"));
        assert!(!shard.contains_column("location"));
        assert_eq!(shard.to_rows::<Sale>().unwrap(), rows);
    }
}
