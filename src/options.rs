//! Read configuration shared by every format.
//!
//! Each reader honours the subset that makes sense for it:
//!
//! | option      | CSV | JSON | Parquet |
//! |-------------|-----|------|---------|
//! | `header`    | yes |      |         |
//! | `names`     | yes | yes  |         |
//! | `usecols`   | yes | yes  |         |
//! | `dtype`     | yes | yes  |         |
//! | `columns`   |     |      | yes     |
//! | `schema`    |     |      | yes     |
//! | `delimiter` | yes |      |         |
//!
//! Options are applied in a fixed order after parsing: header resolution,
//! then `names`, then `usecols`, then `dtype`.

use crate::dtype::DType;
use crate::schema::{InferFromSamples, Schema, TypeInference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How CSV column names are obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Header {
    /// First record of each file holds the column names.
    #[default]
    Infer,
    /// No header row; columns are named `"0"`, `"1"`, ...
    None,
}

/// A column picked by position or by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnSelector {
    fn from(i: usize) -> Self {
        ColumnSelector::Index(i)
    }
}

impl From<&str> for ColumnSelector {
    fn from(s: &str) -> Self {
        ColumnSelector::Name(s.to_string())
    }
}

impl From<String> for ColumnSelector {
    fn from(s: String) -> Self {
        ColumnSelector::Name(s)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub header: Header,
    pub names: Option<Vec<String>>,
    pub usecols: Option<Vec<ColumnSelector>>,
    pub dtype: Option<BTreeMap<String, DType>>,
    pub columns: Option<Vec<String>>,
    pub schema: Option<Schema>,
    pub delimiter: u8,
    /// Rows sampled per column for type inference (`None` = all rows).
    pub infer_rows: Option<usize>,
    #[serde(skip)]
    pub inference: Option<Arc<dyn TypeInference>>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            header: Header::Infer,
            names: None,
            usecols: None,
            dtype: None,
            columns: None,
            schema: None,
            delimiter: b',',
            infer_rows: None,
            inference: None,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, header: Header) -> Self {
        self.header = header;
        self
    }

    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_usecols<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnSelector>,
    {
        self.usecols = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    /// Declare the type of one column; may be called repeatedly.
    #[must_use]
    pub fn with_dtype(mut self, column: impl Into<String>, dtype: DType) -> Self {
        self.dtype
            .get_or_insert_with(BTreeMap::new)
            .insert(column.into(), dtype);
        self
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_infer_rows(mut self, rows: usize) -> Self {
        self.infer_rows = Some(rows);
        self
    }

    #[must_use]
    pub fn with_inference(mut self, inference: Arc<dyn TypeInference>) -> Self {
        self.inference = Some(inference);
        self
    }

    pub(crate) fn type_inference(&self) -> Arc<dyn TypeInference> {
        self.inference
            .clone()
            .unwrap_or_else(|| Arc::new(InferFromSamples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = ReadOptions::default();
        assert_eq!(o.header, Header::Infer);
        assert_eq!(o.delimiter, b',');
        assert!(o.names.is_none());
    }

    #[test]
    fn loads_from_json() {
        let o: ReadOptions = serde_json::from_str(
            r#"{"header": "none", "usecols": [0, "location"], "dtype": {"value": "float"}}"#,
        )
        .unwrap();
        assert_eq!(o.header, Header::None);
        assert_eq!(
            o.usecols,
            Some(vec![ColumnSelector::Index(0), ColumnSelector::Name("location".into())])
        );
        assert_eq!(o.dtype.unwrap()["value"], DType::Float64);
        assert_eq!(o.delimiter, b',');
    }

    #[test]
    fn builder_accumulates_dtypes() {
        let o = ReadOptions::new()
            .with_dtype("a", DType::Int64)
            .with_dtype("b", DType::Utf8);
        assert_eq!(o.dtype.unwrap().len(), 2);
    }
}
