//! Per-file codecs and path discovery.
//!
//! Everything here works on a single file (or a single path expression); the
//! collection-level entry points in [`crate::helpers`] combine these with a
//! [`FileSource`](crate::source::FileSource).

pub mod compression;
pub mod glob;

#[cfg_attr(docsrs, doc(cfg(feature = "io-csv")))]
#[cfg(feature = "io-csv")]
pub mod csv;

#[cfg_attr(docsrs, doc(cfg(feature = "io-json")))]
#[cfg(feature = "io-json")]
pub mod json;

#[cfg_attr(docsrs, doc(cfg(feature = "io-parquet")))]
#[cfg(feature = "io-parquet")]
pub mod parquet;

#[cfg_attr(docsrs, doc(cfg(feature = "io-tfrecord")))]
#[cfg(feature = "io-tfrecord")]
pub mod tfrecord;
