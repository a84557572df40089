//! Filter values and their daemon-side normalization.
//!
//! # Invariants
//! - Dates and timestamps become UTC epoch seconds.
//! - Floats stay floats; every other scalar becomes an integer.
//! - Only finite numbers reach a compiled clause.

use crate::model::record::{Record, RecordRef};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::fmt::{Display, Formatter};

/// A single comparable value supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// Converts to the daemon's numeric domain; `None` for non-finite floats.
    pub fn normalize(&self) -> Option<SphinxValue> {
        match self {
            Self::Int(value) => Some(SphinxValue::Int(*value)),
            Self::Float(value) if value.is_finite() => Some(SphinxValue::Float(*value)),
            Self::Float(_) => None,
            Self::Bool(value) => Some(SphinxValue::Int(i64::from(*value))),
            Self::Date(date) => Some(SphinxValue::Int(
                date.and_time(NaiveTime::MIN).and_utc().timestamp(),
            )),
            Self::DateTime(datetime) => Some(SphinxValue::Int(datetime.and_utc().timestamp())),
            Self::Timestamp(timestamp) => Some(SphinxValue::Int(timestamp.timestamp())),
        }
    }
}

/// Normalized scalar as inlined into a compiled clause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SphinxValue {
    Int(i64),
    Float(f64),
}

impl Display for SphinxValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Right-hand side of a filter lookup, resolved once at the call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Scalar),
    ScalarList(Vec<Scalar>),
    Record(RecordRef),
    RecordList(Vec<RecordRef>),
}

macro_rules! impl_scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value.into())
                }
            }

            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::Scalar(Scalar::from(value))
                }
            }

            impl From<Vec<$ty>> for FilterValue {
                fn from(values: Vec<$ty>) -> Self {
                    FilterValue::ScalarList(values.into_iter().map(Scalar::from).collect())
                }
            }
        )*
    };
}

impl_scalar_from!(
    i64 => Int,
    i32 => Int,
    u32 => Int,
    u16 => Int,
    u8 => Int,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    DateTime<Utc> => Timestamp,
);

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Vec<Scalar>> for FilterValue {
    fn from(values: Vec<Scalar>) -> Self {
        FilterValue::ScalarList(values)
    }
}

impl From<RecordRef> for FilterValue {
    fn from(value: RecordRef) -> Self {
        FilterValue::Record(value)
    }
}

impl From<&Record> for FilterValue {
    fn from(value: &Record) -> Self {
        FilterValue::Record(value.reference())
    }
}

impl From<Vec<RecordRef>> for FilterValue {
    fn from(values: Vec<RecordRef>) -> Self {
        FilterValue::RecordList(values)
    }
}

impl From<&[Record]> for FilterValue {
    fn from(values: &[Record]) -> Self {
        FilterValue::RecordList(values.iter().map(Record::reference).collect())
    }
}
