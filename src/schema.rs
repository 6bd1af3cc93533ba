//! Explicit schemas and type inference for untyped text data.
//!
//! A [`Schema`] is an ordered list of [`Field`]s. It is plain data (serde-friendly)
//! and converts into an Arrow schema on demand.
//!
//! Text formats (CSV) carry no types, so each column is classified by a
//! [`TypeInference`] strategy. The default, [`InferFromSamples`], widens along
//! `bool -> int64 -> float64 -> str` over the sampled cells.

use crate::dtype::DType;
use arrow::datatypes::{Field as ArrowField, Schema as ArrowSchema};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::OnceLock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: DType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable: true,
        }
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn dtype_of(&self, name: &str) -> Option<DType> {
        self.field(name).map(|f| f.dtype)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    #[must_use]
    pub fn to_arrow(&self) -> ArrowSchema {
        ArrowSchema::new(
            self.fields
                .iter()
                .map(|f| ArrowField::new(&f.name, f.dtype.to_arrow(), f.nullable))
                .collect::<Vec<_>>(),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, DType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (S, DType)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(n, d)| Field::new(n, d)).collect())
    }
}

/// Strategy deciding the element type of a text column.
///
/// `samples` are the raw cells of one column; `None` marks an empty cell.
pub trait TypeInference: Send + Sync + Debug {
    fn infer(&self, samples: &[Option<&str>]) -> DType;
}

/// Default strategy: classify every non-empty sample and take the widest kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct InferFromSamples;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Bool,
    Int,
    Float,
    Text,
}

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?[0-9]+$").expect("static regex"))
}

fn float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)([-+]?([0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)(e[-+]?[0-9]+)?|[-+]?(nan|inf|infinity))$")
            .expect("static regex")
    })
}

fn classify(cell: &str) -> Kind {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("true") || cell.eq_ignore_ascii_case("false") {
        Kind::Bool
    } else if int_re().is_match(cell) {
        // out-of-range integers still fit a float column
        if cell.parse::<i64>().is_ok() { Kind::Int } else { Kind::Float }
    } else if float_re().is_match(cell) {
        Kind::Float
    } else {
        Kind::Text
    }
}

fn widen(a: Kind, b: Kind) -> Kind {
    match (a, b) {
        (x, y) if x == y => x,
        (Kind::Bool, _) | (_, Kind::Bool) => Kind::Text,
        (x, y) => x.max(y),
    }
}

impl TypeInference for InferFromSamples {
    fn infer(&self, samples: &[Option<&str>]) -> DType {
        let kind = samples
            .iter()
            .flatten()
            .map(|s| classify(s))
            .reduce(widen);
        match kind {
            Some(Kind::Bool) => DType::Boolean,
            Some(Kind::Int) => DType::Int64,
            Some(Kind::Float) => DType::Float64,
            Some(Kind::Text) | None => DType::Utf8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(cells: &[Option<&str>]) -> DType {
        InferFromSamples.infer(cells)
    }

    #[test]
    fn widening_order() {
        assert_eq!(infer(&[Some("1"), Some("2")]), DType::Int64);
        assert_eq!(infer(&[Some("1"), Some("2.5")]), DType::Float64);
        assert_eq!(infer(&[Some("1e3"), None]), DType::Float64);
        assert_eq!(infer(&[Some("true"), Some("False")]), DType::Boolean);
        assert_eq!(infer(&[Some("1"), Some("yes")]), DType::Utf8);
        assert_eq!(infer(&[Some("true"), Some("1")]), DType::Utf8);
    }

    #[test]
    fn empty_column_is_text() {
        assert_eq!(infer(&[None, None]), DType::Utf8);
        assert_eq!(infer(&[]), DType::Utf8);
    }

    #[test]
    fn non_ascii_digits_are_text() {
        assert_eq!(infer(&[Some("\u{661}\u{662}")]), DType::Utf8);
        assert_eq!(infer(&[Some("1"), Some("\u{967}.\u{968}")]), DType::Utf8);
    }

    #[test]
    fn huge_integers_fall_back_to_float() {
        assert_eq!(infer(&[Some("99999999999999999999999")]), DType::Float64);
    }

    #[test]
    fn schema_from_pairs() {
        let s: Schema = [("ID", DType::Utf8), ("sale_price", DType::Int64)].into_iter().collect();
        assert_eq!(s.dtype_of("sale_price"), Some(DType::Int64));
        assert_eq!(s.to_arrow().fields().len(), 2);
        assert_eq!(s.names().collect::<Vec<_>>(), vec!["ID", "sale_price"]);
    }
}
