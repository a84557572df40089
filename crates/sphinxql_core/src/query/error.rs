//! Query-layer errors.

use crate::client::ClientError;
use crate::codec::CollectionTag;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type QueryResult<T> = Result<T, QueryError>;

/// Caller misuse detected while building or reading a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Filter key with an empty field or lookup segment.
    MalformedKey { key: String },
    /// `__range` needs exactly two values.
    RangeCardinality { key: String, count: usize },
    /// `__in` with no values; `IN ()` is not valid SphinxQL.
    EmptyList { key: String },
    /// A single-value comparison received a list.
    CompositeValue { key: String },
    /// Non-finite float or an integer the daemon cannot represent.
    ValueOutOfRange { key: String },
    /// Record comparison on a query not bound to one record type.
    AmbiguousRecordRef { key: String },
    /// A name that would be inlined is not identifier-safe.
    InvalidIdentifier(String),
    InvalidOption { name: String, reason: String },
    /// Execution requires at least one collection.
    NoCollections,
    IndexOutOfRange { index: usize, len: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedKey { key } => write!(f, "filter key `{key}` is malformed"),
            Self::RangeCardinality { key, count } => write!(
                f,
                "range filter `{key}` needs exactly two values, got {count}"
            ),
            Self::EmptyList { key } => write!(f, "list filter `{key}` needs at least one value"),
            Self::CompositeValue { key } => write!(
                f,
                "filter `{key}` compares against a single value, not a list"
            ),
            Self::ValueOutOfRange { key } => {
                write!(f, "filter `{key}` value cannot be sent to the daemon")
            }
            Self::AmbiguousRecordRef { key } => write!(
                f,
                "filter `{key}` compares against a record, but the query is not bound to a record type"
            ),
            Self::InvalidIdentifier(value) => write!(f, "identifier is invalid: `{value}`"),
            Self::InvalidOption { name, reason } => write!(f, "option `{name}` {reason}"),
            Self::NoCollections => write!(f, "query has no collection to search"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "result index {index} out of range for {len} rows")
            }
        }
    }
}

impl Error for ValidationError {}

/// Requests the daemon or this layer cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedError {
    /// Lookups traversing related records, e.g. `author__name__in`.
    RelatedLookup { key: String },
    /// Lookup suffix outside the fixed comparison table.
    Lookup { key: String, lookup: String },
    /// Excluding a range, rejected only in strict mode.
    ExcludeRange { key: String },
}

impl Display for UnsupportedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelatedLookup { key } => {
                write!(f, "related record lookup `{key}` is not supported")
            }
            Self::Lookup { key, lookup } => {
                write!(f, "lookup `{lookup}` in filter `{key}` is not supported")
            }
            Self::ExcludeRange { key } => {
                write!(f, "excluding range `{key}` is not supported by the daemon")
            }
        }
    }
}

impl Error for UnsupportedError {}

#[derive(Debug)]
pub enum QueryError {
    Validation(ValidationError),
    Unsupported(UnsupportedError),
    Remote(ClientError),
    /// A decoded collection tag has no registered record type.
    Resolution { tag: CollectionTag },
    Storage(StoreError),
    UnknownRecordType(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Unsupported(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::Resolution { tag } => {
                write!(f, "no record type registered for collection tag {tag}")
            }
            Self::Storage(err) => write!(f, "{err}"),
            Self::UnknownRecordType(name) => write!(f, "record type not registered: {name}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Unsupported(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Resolution { .. } | Self::UnknownRecordType(_) => None,
        }
    }
}

impl From<ValidationError> for QueryError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<UnsupportedError> for QueryError {
    fn from(value: UnsupportedError) -> Self {
        Self::Unsupported(value)
    }
}

impl From<ClientError> for QueryError {
    fn from(value: ClientError) -> Self {
        Self::Remote(value)
    }
}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}
