//! Typed error conditions raised by the readers and writers.
//!
//! Public functions return [`anyhow::Result`] with file/record context attached;
//! the conditions callers are expected to branch on are raised as
//! [`XShardsError`] and can be recovered with `err.downcast_ref::<XShardsError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XShardsError {
    /// The read path matched no file, directory or glob entry.
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The path exists but holds no readable data files.
    #[error("No data files found under {}", .0.display())]
    NoDataFiles(PathBuf),

    /// `names` does not line up with the parsed column count.
    #[error("Length of names ({names}) does not match number of columns ({columns})")]
    NamesLengthMismatch { names: usize, columns: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column index {index} out of range for {width} columns")]
    ColumnIndexOutOfRange { index: usize, width: usize },

    #[error("Unknown dtype: {0}")]
    UnknownDType(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A value could not be converted to its declared or inferred type.
    #[error("Cannot cast column '{column}' to {target}: {reason}")]
    Cast {
        column: String,
        target: String,
        reason: String,
    },

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid ImageNet layout: {0}")]
    InvalidImageNetLayout(String),
}
