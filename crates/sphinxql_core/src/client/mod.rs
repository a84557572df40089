//! Daemon client collaborator contracts.
//!
//! # Responsibility
//! - Define the boundary between query compilation and the network client
//!   that speaks to the search daemon.
//! - Carry result metadata and a forward-only row cursor back to the core.
//!
//! # Invariants
//! - Statements arrive fully compiled; untrusted text only travels in `args`.
//! - A cursor yields `None` once exhausted and is never rewound.
//! - The core never retries; `RetryingClient` is the only retry point.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod retry;

pub use retry::RetryingClient;

pub type ClientResult<T> = Result<T, ClientError>;

/// Failure reported by the daemon client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Daemon unreachable or connection dropped. Retryable.
    Connection(String),
    /// Daemon rejected the statement.
    Execution { statement: String, message: String },
    /// Response shape does not match what the core expects.
    MalformedResponse(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(message) => write!(f, "search daemon unreachable: {message}"),
            Self::Execution { statement, message } => {
                write!(f, "search daemon rejected `{statement}`: {message}")
            }
            Self::MalformedResponse(message) => {
                write!(f, "malformed search daemon response: {message}")
            }
        }
    }
}

impl Error for ClientError {}

/// Positional argument or column value on the daemon wire.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }
}

/// Metadata of the last executed statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMeta {
    /// Column name -> position in each row.
    pub fields: BTreeMap<String, usize>,
    /// Total matches the daemon found, before pagination.
    pub total_found: u64,
}

impl ResultMeta {
    /// Metadata of a query that never ran.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Forward-only cursor over result rows.
pub trait RowCursor {
    /// Returns the next row, or `None` once the cursor is exhausted.
    fn next_row(&mut self) -> ClientResult<Option<Vec<SqlValue>>>;
}

/// Cursor over rows already held in memory.
#[derive(Debug, Default)]
pub struct VecCursor {
    rows: std::vec::IntoIter<Vec<SqlValue>>,
}

impl VecCursor {
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowCursor for VecCursor {
    fn next_row(&mut self) -> ClientResult<Option<Vec<SqlValue>>> {
        Ok(self.rows.next())
    }
}

/// Network client executing compiled statements against the daemon.
///
/// One handle is shared by every query; the core never closes it.
pub trait SearchClient {
    /// Runs a select statement and returns its cursor plus metadata.
    fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> ClientResult<(Box<dyn RowCursor>, ResultMeta)>;

    /// Runs an excerpt call and returns one highlighted text per document
    /// argument, in argument order.
    fn call_snippets(&self, sql: &str, args: &[SqlValue]) -> ClientResult<Vec<String>>;
}
