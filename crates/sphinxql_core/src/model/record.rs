//! Records fetched from application storage.

use crate::codec::LocalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One column value of an application record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Application record resolved for a search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Name of the registered record type.
    pub record_type: String,
    pub pk: LocalId,
    pub values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(record_type: impl Into<String>, pk: LocalId) -> Self {
        Self {
            record_type: record_type.into(),
            pk,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter used by stores and tests.
    pub fn with_value(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Text of a string field; `None` for missing or non-text values.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(FieldValue::as_text)
    }

    pub fn reference(&self) -> RecordRef {
        RecordRef {
            record_type: self.record_type.clone(),
            pk: self.pk,
        }
    }
}

/// Lightweight handle used when a filter compares against a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub record_type: String,
    pub pk: LocalId,
}
