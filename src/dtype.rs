//! Declared column types and their conversion into Arrow arrays.
//!
//! [`DType`] is the small set of element types a caller can request through
//! `dtype` or an explicit [`Schema`](crate::schema::Schema). Names follow the
//! usual dataframe vocabulary (`"float"`, `"int"`, `"str"`, ...) so options read the same
//! way they are written in notebook code.

use crate::error::XShardsError;
use anyhow::Result;
use arrow::array::{ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
}

impl DType {
    /// Arrow element type backing this dtype.
    #[must_use]
    pub fn to_arrow(self) -> DataType {
        match self {
            DType::Boolean => DataType::Boolean,
            DType::Int32 => DataType::Int32,
            DType::Int64 => DataType::Int64,
            DType::Float32 => DataType::Float32,
            DType::Float64 => DataType::Float64,
            DType::Utf8 => DataType::Utf8,
        }
    }

    /// Map an Arrow type back, if it is one of ours.
    #[must_use]
    pub fn from_arrow(dt: &DataType) -> Option<Self> {
        match dt {
            DataType::Boolean => Some(DType::Boolean),
            DataType::Int32 => Some(DType::Int32),
            DataType::Int64 => Some(DType::Int64),
            DataType::Float32 => Some(DType::Float32),
            DataType::Float64 => Some(DType::Float64),
            DataType::Utf8 | DataType::LargeUtf8 => Some(DType::Utf8),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DType::Boolean => "bool",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Utf8 => "str",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = XShardsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(DType::Boolean),
            "int32" | "i32" => Ok(DType::Int32),
            "int" | "integer" | "int64" | "i64" | "long" | "bigint" => Ok(DType::Int64),
            "float32" | "f32" => Ok(DType::Float32),
            "float" | "float64" | "f64" | "double" => Ok(DType::Float64),
            "str" | "string" | "utf8" | "object" => Ok(DType::Utf8),
            other => Err(XShardsError::UnknownDType(other.to_string())),
        }
    }
}

impl TryFrom<String> for DType {
    type Error = XShardsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DType> for String {
    fn from(value: DType) -> Self {
        value.name().to_string()
    }
}

fn cast_failure(column: &str, target: DType, value: &str) -> XShardsError {
    XShardsError::Cast {
        column: column.to_string(),
        target: target.to_string(),
        reason: format!("unparseable value '{value}'"),
    }
}

fn parse_all<T, F>(column: &str, target: DType, values: &[Option<&str>], parse: F) -> Result<Vec<Option<T>>>
where
    F: Fn(&str) -> Option<T>,
{
    values
        .iter()
        .map(|v| match v {
            None => Ok(None),
            Some(s) => parse(s.trim())
                .map(Some)
                .ok_or_else(|| cast_failure(column, target, s).into()),
        })
        .collect()
}

/// Build an Arrow array of `dtype` from raw text cells (`None` = null).
///
/// # Errors
/// Returns [`XShardsError::Cast`] on the first cell that does not parse.
pub fn parse_column(column: &str, values: &[Option<&str>], dtype: DType) -> Result<ArrayRef> {
    let array: ArrayRef = match dtype {
        DType::Boolean => Arc::new(BooleanArray::from(parse_all(column, dtype, values, parse_bool)?)),
        DType::Int32 => Arc::new(Int32Array::from(parse_all(column, dtype, values, |s| s.parse().ok())?)),
        DType::Int64 => Arc::new(Int64Array::from(parse_all(column, dtype, values, |s| s.parse().ok())?)),
        DType::Float32 => Arc::new(Float32Array::from(parse_all(column, dtype, values, |s| s.parse().ok())?)),
        DType::Float64 => Arc::new(Float64Array::from(parse_all(column, dtype, values, |s| s.parse().ok())?)),
        DType::Utf8 => Arc::new(StringArray::from(values.to_vec())),
    };
    Ok(array)
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Cast an existing column to `dtype`.
///
/// Casting is strict: a value that cannot be represented in the target type is
/// an error rather than a silent null.
///
/// # Errors
/// Returns [`XShardsError::Cast`] when Arrow rejects the conversion.
pub fn cast_column(column: &str, array: &ArrayRef, dtype: DType) -> Result<ArrayRef> {
    let target = dtype.to_arrow();
    if array.data_type() == &target {
        return Ok(Arc::clone(array));
    }
    let opts = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(array.as_ref(), &target, &opts).map_err(|e| {
        XShardsError::Cast {
            column: column.to_string(),
            target: dtype.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
