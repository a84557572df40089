//! Client-side query compiler and result stitcher for a SphinxQL search daemon.
//! Statements are compiled here; rows are resolved through caller-provided
//! storage.

pub mod client;
pub mod codec;
pub mod config;
pub mod context;
pub mod logging;
pub mod model;
pub mod query;
pub mod registry;
pub mod store;

pub use client::{
    ClientError, ClientResult, ResultMeta, RetryingClient, RowCursor, SearchClient, SqlValue,
    VecCursor,
};
pub use codec::{CodecError, CollectionTag, DocumentIdCodec, LocalId, DEFAULT_DOCUMENT_ID_SHIFT};
pub use config::{ConfigError, LoggingConfig, SearchConfig};
pub use context::{SearchContext, SetupError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{FieldValue, Record, RecordRef};
pub use model::record_type::{FieldDescriptor, FieldKind, IndexOptions, RecordType};
pub use query::{
    escape, CompiledQuery, FilterValue, OptionValue, QueryError, QueryResult, QuerySet, Scalar,
    SearchHit, UnsupportedError, ValidationError,
};
pub use registry::{RecordTypeRegistry, RegistryError, RegistryResult};
pub use store::{RecordStore, SqliteRecordStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
