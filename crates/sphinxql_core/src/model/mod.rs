//! Application record shapes seen by the search core.
//!
//! # Responsibility
//! - Describe application record types through explicit field descriptors.
//! - Carry fetched records without tying the core to one storage engine.
//!
//! # Invariants
//! - A record type owns exactly one collection tag and one collection name.
//! - Records are identified by `(record_type, pk)`.

pub mod record;
pub mod record_type;
