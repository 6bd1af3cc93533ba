mod compression;
mod glob;
#[cfg(feature = "io-tfrecord")]
mod tfrecord;
