//! Record type registry.
//!
//! # Responsibility
//! - Map collection tags, type names and collection names to record types.
//! - Reject registrations that would make decoded document ids ambiguous.
//!
//! # Invariants
//! - Tags, type names and collection names are unique.
//! - Collection, table and column names are identifier-safe, since they are
//!   inlined into daemon and storage statements.

use crate::codec::{CollectionTag, DocumentIdCodec};
use crate::model::record_type::RecordType;
use crate::query::escape::is_identifier;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidIdentifier(String),
    DuplicateTag(CollectionTag),
    DuplicateName(String),
    DuplicateCollection(String),
    TagOutOfRange { tag: CollectionTag, max: CollectionTag },
    UnknownField { record_type: String, field: String },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "identifier is invalid: `{value}`"),
            Self::DuplicateTag(tag) => write!(f, "collection tag already registered: {tag}"),
            Self::DuplicateName(name) => write!(f, "record type already registered: {name}"),
            Self::DuplicateCollection(name) => {
                write!(f, "collection already registered: {name}")
            }
            Self::TagOutOfRange { tag, max } => {
                write!(f, "collection tag {tag} exceeds the maximum {max}")
            }
            Self::UnknownField { record_type, field } => {
                write!(f, "record type `{record_type}` has no field `{field}`")
            }
        }
    }
}

impl Error for RegistryError {}

/// Registry of record types addressable by tag, name or collection.
#[derive(Debug, Default)]
pub struct RecordTypeRegistry {
    by_tag: BTreeMap<CollectionTag, Arc<RecordType>>,
    tags_by_name: BTreeMap<String, CollectionTag>,
    tags_by_collection: BTreeMap<String, CollectionTag>,
}

impl RecordTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one record type.
    ///
    /// The collection name is lower-cased, matching how query collection
    /// lists are normalized.
    pub fn register(&mut self, mut record_type: RecordType) -> RegistryResult<Arc<RecordType>> {
        record_type.collection = record_type.collection.trim().to_ascii_lowercase();
        validate_record_type(&record_type)?;

        if self.by_tag.contains_key(&record_type.tag) {
            return Err(RegistryError::DuplicateTag(record_type.tag));
        }
        if self.tags_by_name.contains_key(record_type.name.as_str()) {
            return Err(RegistryError::DuplicateName(record_type.name));
        }
        if self
            .tags_by_collection
            .contains_key(record_type.collection.as_str())
        {
            return Err(RegistryError::DuplicateCollection(record_type.collection));
        }

        let record_type = Arc::new(record_type);
        self.tags_by_name
            .insert(record_type.name.clone(), record_type.tag);
        self.tags_by_collection
            .insert(record_type.collection.clone(), record_type.tag);
        self.by_tag.insert(record_type.tag, Arc::clone(&record_type));
        Ok(record_type)
    }

    /// Checks that every registered tag fits the codec's tag bits.
    pub fn check_tags(&self, codec: &DocumentIdCodec) -> RegistryResult<()> {
        match self.by_tag.keys().find(|tag| **tag > codec.max_tag()) {
            Some(tag) => Err(RegistryError::TagOutOfRange {
                tag: *tag,
                max: codec.max_tag(),
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    pub fn by_tag(&self, tag: CollectionTag) -> Option<Arc<RecordType>> {
        self.by_tag.get(&tag).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<RecordType>> {
        let tag = self.tags_by_name.get(name.trim())?;
        self.by_tag(*tag)
    }

    pub fn by_collection(&self, collection: &str) -> Option<Arc<RecordType>> {
        let tag = self
            .tags_by_collection
            .get(collection.trim().to_ascii_lowercase().as_str())?;
        self.by_tag(*tag)
    }
}

fn validate_record_type(record_type: &RecordType) -> RegistryResult<()> {
    for value in [
        record_type.name.as_str(),
        record_type.collection.as_str(),
        record_type.table.as_str(),
        record_type.primary_key.as_str(),
    ] {
        if !is_identifier(value) {
            return Err(RegistryError::InvalidIdentifier(value.to_string()));
        }
    }
    if let Some(field) = record_type
        .fields
        .iter()
        .find(|field| !is_identifier(&field.name))
    {
        return Err(RegistryError::InvalidIdentifier(field.name.clone()));
    }

    let options = &record_type.options;
    for name in options
        .included_fields
        .iter()
        .chain(&options.excluded_fields)
        .chain(&options.stored_attributes)
        .chain(&options.stored_fields)
    {
        if record_type.field(name).is_none() {
            return Err(RegistryError::UnknownField {
                record_type: record_type.name.clone(),
                field: name.clone(),
            });
        }
    }
    Ok(())
}
