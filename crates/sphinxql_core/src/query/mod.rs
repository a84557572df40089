//! Query compilation, execution and result stitching.
//!
//! # Responsibility
//! - Compile filter lookups and chain state into one daemon statement.
//! - Execute lazily and resolve rows onto application records.
//!
//! # See also
//! - `crate::client` for the daemon boundary.
//! - `crate::store` for record lookups.

pub mod builder;
pub mod clause;
pub mod error;
pub mod escape;
pub mod options;
pub mod passages;
pub mod queryset;
pub mod value;

pub use builder::{CompiledQuery, OrderTerm, QueryDescriptor};
pub use clause::{CmpOp, Clause};
pub use error::{QueryError, QueryResult, UnsupportedError, ValidationError};
pub use escape::escape;
pub use options::{OptionValue, PassageOptions};
pub use queryset::{QuerySet, SearchHit};
pub use value::{FilterValue, Scalar, SphinxValue};
