//! Composition root shared by every query.
//!
//! # Responsibility
//! - Validate configuration and registry together, once, at startup.
//! - Hand out query objects bound to the shared collaborators.
//!
//! # Invariants
//! - The daemon client handle is shared and never closed here.
//! - Every registered tag fits the configured document id layout.

use crate::client::SearchClient;
use crate::codec::DocumentIdCodec;
use crate::config::{ConfigError, SearchConfig};
use crate::query::error::{QueryError, QueryResult};
use crate::query::QuerySet;
use crate::registry::{RecordTypeRegistry, RegistryError};
use crate::store::RecordStore;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    Config(ConfigError),
    Registry(RegistryError),
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Registry(err) => Some(err),
        }
    }
}

impl From<ConfigError> for SetupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RegistryError> for SetupError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

/// Shared collaborators and settings behind every query object.
#[derive(Clone)]
pub struct SearchContext {
    config: Arc<SearchConfig>,
    codec: DocumentIdCodec,
    client: Arc<dyn SearchClient>,
    registry: Arc<RecordTypeRegistry>,
    store: Arc<dyn RecordStore>,
}

impl SearchContext {
    /// Builds a context after validating `config` against `registry`.
    ///
    /// # Errors
    /// - `SetupError::Config` for invalid settings.
    /// - `SetupError::Registry` when a tag does not fit the id layout.
    pub fn new(
        config: SearchConfig,
        client: Arc<dyn SearchClient>,
        registry: RecordTypeRegistry,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, SetupError> {
        let codec = config.validate()?;
        registry.check_tags(&codec)?;
        Ok(Self {
            config: Arc::new(config),
            codec,
            client,
            registry: Arc::new(registry),
            store,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn codec(&self) -> &DocumentIdCodec {
        &self.codec
    }

    pub fn client(&self) -> &dyn SearchClient {
        self.client.as_ref()
    }

    pub fn registry(&self) -> &RecordTypeRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Query over the collection of one registered record type.
    pub fn search(&self, record_type: &str) -> QueryResult<QuerySet> {
        let record_type = self
            .registry
            .by_name(record_type)
            .ok_or_else(|| QueryError::UnknownRecordType(record_type.to_string()))?;
        Ok(QuerySet::for_record_type(self.clone(), record_type))
    }

    /// Unbound query over a collection list such as `"articles, news"`.
    pub fn search_collections(&self, collections: &str) -> QuerySet {
        QuerySet::new(self.clone(), collections)
    }
}
