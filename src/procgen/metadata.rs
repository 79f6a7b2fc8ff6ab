//! Named, typed values shared by every step of one building design.
//!
//! Values are keyed by `(name, kind)`, so a float and an int stored under the
//! same name do not collide.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A value stored in the metadata map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Text(String),
}

impl MetaValue {
    pub fn kind(&self) -> MetaKind {
        match self {
            MetaValue::Float(_) => MetaKind::Float,
            MetaValue::Int(_) => MetaKind::Int,
            MetaValue::Bool(_) => MetaKind::Bool,
            MetaValue::Text(_) => MetaKind::Text,
        }
    }
}

/// Type half of a metadata key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MetaKind {
    Float,
    Int,
    Bool,
    Text,
}

/// Mutable metadata map owned by one in-flight design.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    values: HashMap<(MetaKind, String), MetaValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value of the same kind.
    pub fn set(&mut self, name: impl Into<String>, value: MetaValue) {
        self.values.insert((value.kind(), name.into()), value);
    }

    pub fn get(&self, name: &str, kind: MetaKind) -> Option<&MetaValue> {
        self.values.get(&(kind, name.to_string()))
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name, MetaKind::Float) {
            Some(MetaValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name, MetaKind::Int) {
            Some(MetaValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name, MetaKind::Bool) {
            Some(MetaValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name, MetaKind::Text) {
            Some(MetaValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
