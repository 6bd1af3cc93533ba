//! TFRecord datasets of images (feature `io-tfrecord`).
//!
//! [`write_tfrecord`] converts an ImageNet-style directory tree into sharded
//! TFRecord files of `tf.train.Example`s; [`read_tfrecord`] streams them back
//! as an [`ImageNetDataset`].

pub mod example;
mod imagenet;

pub use imagenet::*;

use crate::error::XShardsError;
use std::fmt;
use std::str::FromStr;

/// Dataset layouts understood by [`write_tfrecord`] and [`read_tfrecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TfRecordFormat {
    ImageNet,
}

impl FromStr for TfRecordFormat {
    type Err = XShardsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "imagenet" => Ok(TfRecordFormat::ImageNet),
            _ => Err(XShardsError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for TfRecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TfRecordFormat::ImageNet => f.write_str("imagenet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_names() {
        assert_eq!("imagenet".parse::<TfRecordFormat>().unwrap(), TfRecordFormat::ImageNet);
        assert_eq!("ImageNet".parse::<TfRecordFormat>().unwrap(), TfRecordFormat::ImageNet);
        assert!(matches!(
            "cifar".parse::<TfRecordFormat>(),
            Err(XShardsError::UnsupportedFormat(s)) if s == "cifar"
        ));
    }
}
