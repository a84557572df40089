//! Application storage collaborator.
//!
//! # Responsibility
//! - Define the batch primary-key lookup the core uses to resolve hits.
//! - Provide a SQLite-backed implementation over declared record types.
//!
//! # Invariants
//! - One call per record type per fill; ids are bound, never inlined.
//! - Returned order is irrelevant; the core re-keys records by primary key.

use crate::codec::LocalId;
use crate::model::record::Record;
use crate::model::record_type::RecordType;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteRecordStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored record data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Batch lookup of application records by primary key.
pub trait RecordStore {
    /// Returns the records of `record_type` whose primary key is in `ids`.
    ///
    /// Ids without a stored record are simply absent from the result.
    fn fetch_by_ids(
        &self,
        record_type: &RecordType,
        ids: &BTreeSet<LocalId>,
    ) -> StoreResult<Vec<Record>>;
}
