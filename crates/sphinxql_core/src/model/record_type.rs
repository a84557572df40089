//! Record type descriptors.
//!
//! # Responsibility
//! - Declare which fields an application record type exposes to the daemon.
//! - Derive the text fields used for excerpt highlighting.
//!
//! # Invariants
//! - Field kinds follow the daemon attribute typing: only `String` fields
//!   are highlightable.
//! - The highlight field list is computed once per record type.

use crate::codec::CollectionTag;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Daemon-side storage kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    UInt,
    BigInt,
    Float,
    Timestamp,
    Bool,
    Unknown,
}

impl FieldKind {
    pub fn is_string(self) -> bool {
        self == FieldKind::String
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::UInt => "uint",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Timestamp => "timestamp",
            Self::Bool => "bool",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn is_string(&self) -> bool {
        self.kind.is_string()
    }
}

/// Per-type index options controlling excerpt fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    pub included_fields: Vec<String>,
    pub excluded_fields: Vec<String>,
    /// Fields indexed only as attributes, not as full-text fields.
    pub stored_attributes: Vec<String>,
    /// Attributes that are also stored as full-text fields.
    pub stored_fields: Vec<String>,
}

/// An application record type registered with the search core.
#[derive(Debug)]
pub struct RecordType {
    pub name: String,
    pub tag: CollectionTag,
    /// Daemon collection (index) name.
    pub collection: String,
    /// Storage table backing the record type.
    pub table: String,
    pub primary_key: String,
    pub fields: Vec<FieldDescriptor>,
    pub options: IndexOptions,
    highlight_fields: OnceCell<Vec<String>>,
}

impl RecordType {
    /// Creates a record type whose collection and table default to `name`.
    pub fn new(name: impl Into<String>, tag: CollectionTag) -> Self {
        let name = name.into();
        Self {
            collection: name.clone(),
            table: name.clone(),
            name,
            tag,
            primary_key: "id".to_string(),
            fields: Vec::new(),
            options: IndexOptions::default(),
            highlight_fields: OnceCell::new(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor::new(name, kind));
        self.highlight_fields = OnceCell::new();
        self
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self.highlight_fields = OnceCell::new();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Text fields sent to the excerpt call, in declaration order.
    ///
    /// With `included_fields` set, the list is the included string fields not
    /// excluded, followed by string-typed `stored_fields`. Otherwise every
    /// string field that is neither excluded nor a plain stored attribute.
    pub fn highlight_fields(&self) -> &[String] {
        self.highlight_fields.get_or_init(|| self.compute_highlight_fields())
    }

    fn compute_highlight_fields(&self) -> Vec<String> {
        let opts = &self.options;
        let is_string = |name: &str| self.field(name).is_some_and(FieldDescriptor::is_string);

        if !opts.included_fields.is_empty() {
            let mut included = opts
                .included_fields
                .iter()
                .filter(|name| !opts.excluded_fields.contains(name) && is_string(name))
                .cloned()
                .collect::<Vec<_>>();
            included.extend(
                opts.stored_fields
                    .iter()
                    .filter(|name| is_string(name))
                    .cloned(),
            );
            return included;
        }

        self.fields
            .iter()
            .filter(|field| {
                !opts.excluded_fields.contains(&field.name)
                    && (!opts.stored_attributes.contains(&field.name)
                        || opts.stored_fields.contains(&field.name))
                    && field.is_string()
            })
            .map(|field| field.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKind, IndexOptions, RecordType};

    fn article() -> RecordType {
        RecordType::new("articles", 1)
            .with_field("id", FieldKind::UInt)
            .with_field("title", FieldKind::String)
            .with_field("body", FieldKind::String)
            .with_field("slug", FieldKind::String)
            .with_field("created", FieldKind::Timestamp)
    }

    #[test]
    fn highlight_fields_default_to_all_string_fields() {
        assert_eq!(article().highlight_fields(), ["title", "body", "slug"]);
    }

    #[test]
    fn highlight_fields_skip_excluded_and_plain_attributes() {
        let record_type = article().with_options(IndexOptions {
            excluded_fields: vec!["body".to_string()],
            stored_attributes: vec!["slug".to_string(), "title".to_string()],
            stored_fields: vec!["title".to_string()],
            ..IndexOptions::default()
        });
        assert_eq!(record_type.highlight_fields(), ["title"]);
    }

    #[test]
    fn highlight_fields_honor_included_list() {
        let record_type = article().with_options(IndexOptions {
            included_fields: vec!["body".to_string(), "created".to_string()],
            stored_fields: vec!["slug".to_string()],
            ..IndexOptions::default()
        });
        assert_eq!(record_type.highlight_fields(), ["body", "slug"]);
    }
}
