//! # XShards
//!
//! Sharded loading of tabular data for machine-learning pipelines. A read call
//! turns a file, directory or glob of **CSV**, **JSON** or **Parquet** files
//! into a [`ShardedCollection`]: an ordered, immutable set of partitions, one
//! per data file, each materializing into an Arrow-backed [`Shard`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use xshards::*;
//! # fn main() -> anyhow::Result<()> {
//! let sales = read_csv("data/sales", ReadOptions::default())?;
//! println!("{} partitions", sales.num_partitions());
//!
//! for shard in sales.collect()? {
//!     assert!(shard.contains_column("location"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### ShardedCollection
//!
//! Collections are:
//! - **Lazy**: the read path is resolved up front, files are parsed only by a
//!   terminal call ([`collect`](ShardedCollection::collect),
//!   [`len`](ShardedCollection::len), `write_*`)
//! - **Immutable**: [`transform_shard`](ShardedCollection::transform_shard) and
//!   [`repartition`](ShardedCollection::repartition) return new collections
//! - **Ordered**: partitions come back in sorted file order, however the
//!   parallel runner schedules them
//!
//! ### Read options
//!
//! [`ReadOptions`] carries the per-format knobs. For CSV and JSON they apply
//! in a fixed order:
//!
//! 1. header resolution ([`Header::Infer`] takes names from the first record,
//!    [`Header::None`] numbers columns `"0"`, `"1"`, ...)
//! 2. `names` renames positionally (the count must match)
//! 3. `usecols` projects by index or post-rename name
//! 4. `dtype` casts named columns
//!
//! Parquet honours `columns` (projection pushdown) and `schema` (authoritative
//! column types).
//!
//! ### Execution Modes
//!
//! - **Parallel** (default) - [`collect()`](ShardedCollection::collect) or
//!   [`collect_par(Some(n))`](ShardedCollection::collect_par) on a dedicated pool
//! - **Sequential** - [`collect_seq()`](ShardedCollection::collect_seq)
//!
//! ## TFRecord
//!
//! With `io-tfrecord`, [`write_tfrecord`] converts an ImageNet directory tree
//! into sharded TFRecord files and [`read_tfrecord`] iterates them back:
//!
//! ```no_run
//! use xshards::*;
//! # fn main() -> anyhow::Result<()> {
//! write_tfrecord(TfRecordFormat::ImageNet, "raw/imagenet", "out")?;
//! let mut train = read_tfrecord("imagenet".parse()?, "out/train", true)?;
//! let first: Vec<_> = train.by_ref().take(1).collect::<anyhow::Result<_>>()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `io-csv`, `io-json`, `io-parquet`, `io-tfrecord`: formats
//! - `compression-gzip`, `compression-zstd`, `compression-bzip2`,
//!   `compression-xz`: transparent codecs for the text formats and TFRecord
//!
//! All are enabled by default.
//!
//! ## Logging
//!
//! The crate emits `tracing` events (fragment resolution, collection runs,
//! shard writes) and never installs a subscriber.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod collection;
pub mod dtype;
pub mod error;
pub mod helpers;
pub mod io;
pub mod options;
pub mod runner;
pub mod schema;
pub mod shard;
pub mod source;
pub mod table;
pub mod testing;

#[cfg_attr(docsrs, doc(cfg(feature = "io-tfrecord")))]
#[cfg(feature = "io-tfrecord")]
pub mod image;

pub use collection::ShardedCollection;
pub use dtype::DType;
pub use error::XShardsError;
pub use helpers::*;
pub use options::{ColumnSelector, Header, ReadOptions};
pub use runner::{ExecMode, Runner};
pub use schema::{Field, InferFromSamples, Schema, TypeInference};
pub use shard::Shard;
pub use source::{FileSource, FragmentFormat, MemorySource, ShardSource};

#[cfg(feature = "io-tfrecord")]
pub use image::{
    read_tfrecord, read_tfrecord_with, write_tfrecord, write_tfrecord_with, ImageExample,
    ImageNetDataset, ImageNetWriteOptions, ReadTfRecordOptions, TfRecordFormat,
};
