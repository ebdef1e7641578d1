//! `tf.train.Example` protobuf messages.
//!
//! Hand-written `prost` equivalents of `tensorflow/core/example/example.proto`
//! and `feature.proto`. Field tags match the upstream definitions so the
//! encoded bytes are readable by TensorFlow. `Features` uses a `BTreeMap` so
//! that encoding is deterministic.

use std::collections::BTreeMap;

#[derive(Clone, PartialEq, prost::Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FloatList {
    #[prost(float, repeated, packed = "true", tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Int64List {
    #[prost(int64, repeated, packed = "true", tag = "1")]
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
    #[prost(btree_map = "string, message", tag = "1")]
    pub feature: BTreeMap<String, Feature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

impl Feature {
    pub fn int64(value: i64) -> Self {
        Self::int64_list(vec![value])
    }

    pub fn int64_list(value: Vec<i64>) -> Self {
        Self {
            kind: Some(feature::Kind::Int64List(Int64List { value })),
        }
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::bytes_list(vec![value.into()])
    }

    pub fn bytes_list(value: Vec<Vec<u8>>) -> Self {
        Self {
            kind: Some(feature::Kind::BytesList(BytesList { value })),
        }
    }

    pub fn float_list(value: Vec<f32>) -> Self {
        Self {
            kind: Some(feature::Kind::FloatList(FloatList { value })),
        }
    }

    pub fn as_int64_list(&self) -> Option<&[i64]> {
        match &self.kind {
            Some(feature::Kind::Int64List(list)) => Some(&list.value),
            _ => None,
        }
    }

    pub fn as_bytes_list(&self) -> Option<&[Vec<u8>]> {
        match &self.kind {
            Some(feature::Kind::BytesList(list)) => Some(&list.value),
            _ => None,
        }
    }

    pub fn as_float_list(&self) -> Option<&[f32]> {
        match &self.kind {
            Some(feature::Kind::FloatList(list)) => Some(&list.value),
            _ => None,
        }
    }
}

impl Example {
    /// Builds an example from `(key, feature)` pairs.
    pub fn from_features<K: Into<String>>(features: impl IntoIterator<Item = (K, Feature)>) -> Self {
        Self {
            features: Some(Features {
                feature: features
                    .into_iter()
                    .map(|(key, feature)| (key.into(), feature))
                    .collect(),
            }),
        }
    }

    pub fn feature(&self, key: &str) -> Option<&Feature> {
        self.features.as_ref()?.feature.get(key)
    }
}
