//! Collection-level entry points: `read_*` free functions and the matching
//! `ShardedCollection::write_*` methods.

#[cfg(any(feature = "io-csv", feature = "io-json", feature = "io-parquet"))]
mod common;

#[cfg(feature = "io-csv")]
pub(crate) mod csv;
#[cfg(feature = "io-json")]
pub(crate) mod json;
#[cfg(feature = "io-parquet")]
pub(crate) mod parquet;

#[cfg(feature = "io-csv")]
pub use csv::*;
#[cfg(feature = "io-json")]
pub use json::*;
#[cfg(feature = "io-parquet")]
pub use parquet::*;
