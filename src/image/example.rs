//! `tf.train.Example` protobuf messages.
//!
//! Hand-declared with `prost` derives; field tags match TensorFlow's
//! `example.proto` / `feature.proto`, so records written here are readable by
//! TensorFlow and vice versa.

use std::collections::HashMap;

#[derive(Clone, PartialEq, prost::Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Feature {
    #[prost(oneof = "feature::Kind", tags = "1, 2, 3")]
    pub kind: Option<feature::Kind>,
}

pub mod feature {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        BytesList(super::BytesList),
        #[prost(message, tag = "2")]
        FloatList(super::FloatList),
        #[prost(message, tag = "3")]
        Int64List(super::Int64List),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Features {
    #[prost(map = "string, message", tag = "1")]
    pub feature: HashMap<String, Feature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

impl Feature {
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: Some(feature::Kind::BytesList(BytesList {
                value: vec![value.into()],
            })),
        }
    }

    pub fn int64(value: i64) -> Self {
        Self {
            kind: Some(feature::Kind::Int64List(Int64List { value: vec![value] })),
        }
    }

    pub fn float(value: f32) -> Self {
        Self {
            kind: Some(feature::Kind::FloatList(FloatList { value: vec![value] })),
        }
    }
}

impl Example {
    pub fn from_features<I, K>(features: I) -> Self
    where
        I: IntoIterator<Item = (K, Feature)>,
        K: Into<String>,
    {
        Self {
            features: Some(Features {
                feature: features.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            }),
        }
    }

    pub fn feature(&self, key: &str) -> Option<&Feature> {
        self.features.as_ref()?.feature.get(key)
    }

    /// First value of a bytes feature.
    pub fn bytes(&self, key: &str) -> Option<&[u8]> {
        match &self.feature(key)?.kind {
            Some(feature::Kind::BytesList(l)) => l.value.first().map(Vec::as_slice),
            _ => None,
        }
    }

    /// First value of an int64 feature.
    pub fn int64(&self, key: &str) -> Option<i64> {
        match &self.feature(key)?.kind {
            Some(feature::Kind::Int64List(l)) => l.value.first().copied(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn encodes_and_decodes() {
        let ex = Example::from_features([
            ("image/encoded", Feature::bytes(vec![0xff, 0xd8])),
            ("image/class/label", Feature::int64(3)),
        ]);
        let decoded = Example::decode(ex.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.bytes("image/encoded"), Some(&[0xff, 0xd8][..]));
        assert_eq!(decoded.int64("image/class/label"), Some(3));
        assert_eq!(decoded.int64("image/encoded"), None);
        assert!(decoded.feature("missing").is_none());
    }
}
