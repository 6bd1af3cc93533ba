//! Column-level rewrites applied to a freshly parsed `RecordBatch`.
//!
//! These implement the post-parse half of [`ReadOptions`]: renaming (`names`),
//! projection (`usecols` / `columns`) and casting (`dtype` / `schema`).

use crate::dtype::{cast_column, DType};
use crate::error::XShardsError;
use crate::options::{ColumnSelector, ReadOptions};
use crate::schema::Schema;
use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef};
use arrow::datatypes::{Field, Schema as ArrowSchema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Assemble a batch from named columns. `rows` is only consulted when there
/// are no columns at all.
pub(crate) fn batch_from_columns(
    names: Vec<String>,
    columns: Vec<ArrayRef>,
    rows: usize,
) -> Result<RecordBatch> {
    let fields: Vec<Field> = names
        .into_iter()
        .zip(&columns)
        .map(|(name, col)| Field::new(name, col.data_type().clone(), true))
        .collect();
    rebuild(Arc::new(ArrowSchema::new(fields)), columns, rows)
}

fn rebuild(schema: Arc<ArrowSchema>, columns: Vec<ArrayRef>, rows: usize) -> Result<RecordBatch> {
    let opts = RecordBatchOptions::new().with_row_count(Some(rows));
    RecordBatch::try_new_with_options(schema, columns, &opts).context("assemble record batch")
}

fn index_of(batch: &RecordBatch, name: &str) -> Result<usize> {
    batch
        .schema()
        .index_of(name)
        .map_err(|_| XShardsError::UnknownColumn(name.to_string()).into())
}

/// Replace every column name, positionally.
pub fn rename(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch> {
    let width = batch.num_columns();
    if names.len() != width {
        return Err(XShardsError::NamesLengthMismatch {
            names: names.len(),
            columns: width,
        }
        .into());
    }
    let fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .zip(names)
        .map(|(f, n)| f.as_ref().clone().with_name(n))
        .collect();
    rebuild(
        Arc::new(ArrowSchema::new(fields)),
        batch.columns().to_vec(),
        batch.num_rows(),
    )
}

/// Keep only the selected columns, in selector order.
pub fn select(batch: &RecordBatch, selectors: &[ColumnSelector]) -> Result<RecordBatch> {
    let width = batch.num_columns();
    let indices = selectors
        .iter()
        .map(|sel| match sel {
            ColumnSelector::Index(i) if *i < width => Ok(*i),
            ColumnSelector::Index(i) => Err(XShardsError::ColumnIndexOutOfRange { index: *i, width }.into()),
            ColumnSelector::Name(n) => index_of(batch, n),
        })
        .collect::<Result<Vec<_>>>()?;
    project(batch, &indices)
}

/// Keep only the named columns, in the given order.
pub fn select_names(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch> {
    let indices = names
        .iter()
        .map(|n| index_of(batch, n))
        .collect::<Result<Vec<_>>>()?;
    project(batch, &indices)
}

fn project(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch> {
    let schema = Arc::new(batch.schema().project(indices).context("project schema")?);
    let columns = indices.iter().map(|&i| Arc::clone(batch.column(i))).collect();
    rebuild(schema, columns, batch.num_rows())
}

fn cast_where<F>(batch: &RecordBatch, target: F) -> Result<RecordBatch>
where
    F: Fn(&str) -> Option<DType>,
{
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, col) in schema.fields().iter().zip(batch.columns()) {
        match target(field.name()) {
            Some(dtype) => {
                let cast = cast_column(field.name(), col, dtype)?;
                fields.push(field.as_ref().clone().with_data_type(dtype.to_arrow()));
                columns.push(cast);
            }
            None => {
                fields.push(field.as_ref().clone());
                columns.push(Arc::clone(col));
            }
        }
    }
    rebuild(Arc::new(ArrowSchema::new(fields)), columns, batch.num_rows())
}

/// Cast the listed columns; every key must name an existing column.
pub fn cast_dtypes(batch: &RecordBatch, dtypes: &BTreeMap<String, DType>) -> Result<RecordBatch> {
    for name in dtypes.keys() {
        index_of(batch, name)?;
    }
    cast_where(batch, |name| dtypes.get(name).copied())
}

/// Cast every column the schema declares and apply its nullability. Schema
/// fields missing from the batch (e.g. projected away) are ignored.
///
/// # Errors
/// A failed cast, or [`XShardsError::SchemaMismatch`] when a column declared
/// non-nullable holds nulls.
pub fn conform_to_schema(batch: &RecordBatch, schema: &Schema) -> Result<RecordBatch> {
    let cast = cast_where(batch, |name| schema.dtype_of(name))?;
    let cast_schema = cast.schema();
    let mut fields = Vec::with_capacity(cast.num_columns());
    for (field, col) in cast_schema.fields().iter().zip(cast.columns()) {
        let Some(declared) = schema.field(field.name()) else {
            fields.push(field.as_ref().clone());
            continue;
        };
        if !declared.nullable && col.null_count() > 0 {
            return Err(XShardsError::SchemaMismatch(format!(
                "column '{}' is declared non-nullable but has {} null(s)",
                field.name(),
                col.null_count()
            ))
            .into());
        }
        fields.push(field.as_ref().clone().with_nullable(declared.nullable));
    }
    rebuild(
        Arc::new(ArrowSchema::new(fields)),
        cast.columns().to_vec(),
        cast.num_rows(),
    )
}

/// `names` -> `usecols` -> `dtype`, for the text formats.
pub(crate) fn apply_text_options(batch: RecordBatch, opts: &ReadOptions) -> Result<RecordBatch> {
    let mut batch = batch;
    if let Some(names) = &opts.names {
        batch = rename(&batch, names)?;
    }
    if let Some(cols) = &opts.usecols {
        batch = select(&batch, cols)?;
    }
    if let Some(dtypes) = &opts.dtype {
        batch = cast_dtypes(&batch, dtypes)?;
    }
    Ok(batch)
}
