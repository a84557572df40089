//! Filter lookup compiler.
//!
//! # Responsibility
//! - Turn `field`, `field__in`, `field__range` and `field__<cmp>` lookups
//!   into clause values with a fixed operator vocabulary.
//!
//! # Invariants
//! - Clauses only ever render identifier-checked field names, operators from
//!   the fixed table and normalized numbers.
//! - Exclusion uses the inverse operator, never a wrapping `NOT (...)`,
//!   except for ranges which the daemon cannot negate.

use super::error::{QueryResult, UnsupportedError, ValidationError};
use super::escape::is_identifier;
use super::value::{FilterValue, Scalar, SphinxValue};
use crate::model::record::RecordRef;
use log::warn;
use std::fmt::{Display, Formatter};

/// Symbolic comparison operators reachable through `field__<cmp>` lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Exact,
    Ne,
}

impl CmpOp {
    pub fn from_lookup(lookup: &str) -> Option<Self> {
        match lookup {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "exact" => Some(Self::Exact),
            "ne" => Some(Self::Ne),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Exact => "=",
            Self::Ne => "!=",
        }
    }

    /// Operator matching exactly the rows this one rejects.
    pub fn inverse(self) -> Self {
        match self {
            Self::Gt => Self::Lte,
            Self::Gte => Self::Lt,
            Self::Lt => Self::Gte,
            Self::Lte => Self::Gt,
            Self::Exact => Self::Ne,
            Self::Ne => Self::Exact,
        }
    }
}

/// One compiled filter or exclude fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Compare {
        field: String,
        op: CmpOp,
        value: SphinxValue,
    },
    In {
        field: String,
        values: Vec<SphinxValue>,
        negated: bool,
    },
    Between {
        field: String,
        low: SphinxValue,
        high: SphinxValue,
        negated: bool,
    },
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compare { field, op, value } => write!(f, "`{field}` {} {value}", op.symbol()),
            Self::In {
                field,
                values,
                negated,
            } => {
                let values = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let not = if *negated { "NOT " } else { "" };
                write!(f, "`{field}` {not}IN ({values})")
            }
            Self::Between {
                field,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{not}`{field}` BETWEEN {low} AND {high}")
            }
        }
    }
}

/// Query state the compiler needs to resolve values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileContext<'a> {
    /// Name of the record type the query is bound to, if any.
    pub bound_type: Option<&'a str>,
    pub strict_range_exclude: bool,
}

/// Compiles one `key = value` lookup into a clause.
///
/// # Errors
/// - `Unsupported` for related lookups (`a__b__c`) and unknown suffixes.
/// - `Validation` for malformed keys, wrong value shapes and range sizes.
pub fn compile_lookup(
    key: &str,
    value: &FilterValue,
    exclude: bool,
    ctx: &CompileContext<'_>,
) -> QueryResult<Clause> {
    let parts = key.split("__").collect::<Vec<_>>();
    if parts.len() > 2 {
        return Err(UnsupportedError::RelatedLookup {
            key: key.to_string(),
        }
        .into());
    }
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ValidationError::MalformedKey {
            key: key.to_string(),
        }
        .into());
    }

    let field = parts[0];
    if !is_identifier(field) {
        return Err(ValidationError::InvalidIdentifier(field.to_string()).into());
    }
    let field = field.to_string();

    let Some(lookup) = parts.get(1).copied() else {
        let op = if exclude { CmpOp::Ne } else { CmpOp::Exact };
        return Ok(Clause::Compare {
            field,
            op,
            value: single_value(key, value, ctx)?,
        });
    };

    match lookup {
        "in" => {
            let values = list_values(key, value, ctx)?;
            if values.is_empty() {
                return Err(ValidationError::EmptyList {
                    key: key.to_string(),
                }
                .into());
            }
            Ok(Clause::In {
                field,
                values,
                negated: exclude,
            })
        }
        "range" => {
            let values = list_values(key, value, ctx)?;
            let [low, high] = values[..] else {
                return Err(ValidationError::RangeCardinality {
                    key: key.to_string(),
                    count: values.len(),
                }
                .into());
            };
            if exclude {
                if ctx.strict_range_exclude {
                    return Err(UnsupportedError::ExcludeRange {
                        key: key.to_string(),
                    }
                    .into());
                }
                warn!(
                    "event=exclude_range module=query status=warn key={} detail=daemon_may_reject_not_between",
                    key
                );
            }
            Ok(Clause::Between {
                field,
                low,
                high,
                negated: exclude,
            })
        }
        other => match CmpOp::from_lookup(other) {
            Some(op) => Ok(Clause::Compare {
                field,
                op: if exclude { op.inverse() } else { op },
                value: single_value(key, value, ctx)?,
            }),
            None => Err(UnsupportedError::Lookup {
                key: key.to_string(),
                lookup: other.to_string(),
            }
            .into()),
        },
    }
}

fn single_value(key: &str, value: &FilterValue, ctx: &CompileContext<'_>) -> QueryResult<SphinxValue> {
    match value {
        FilterValue::Scalar(scalar) => normalize(key, scalar),
        FilterValue::Record(record) => record_pk(key, record, ctx),
        FilterValue::ScalarList(_) | FilterValue::RecordList(_) => {
            Err(ValidationError::CompositeValue {
                key: key.to_string(),
            }
            .into())
        }
    }
}

fn list_values(
    key: &str,
    value: &FilterValue,
    ctx: &CompileContext<'_>,
) -> QueryResult<Vec<SphinxValue>> {
    match value {
        FilterValue::Scalar(scalar) => Ok(vec![normalize(key, scalar)?]),
        FilterValue::ScalarList(scalars) => scalars
            .iter()
            .map(|scalar| normalize(key, scalar))
            .collect(),
        FilterValue::Record(record) => Ok(vec![record_pk(key, record, ctx)?]),
        FilterValue::RecordList(records) => records
            .iter()
            .map(|record| record_pk(key, record, ctx))
            .collect(),
    }
}

fn normalize(key: &str, scalar: &Scalar) -> QueryResult<SphinxValue> {
    scalar.normalize().ok_or_else(|| {
        ValidationError::ValueOutOfRange {
            key: key.to_string(),
        }
        .into()
    })
}

fn record_pk(key: &str, record: &RecordRef, ctx: &CompileContext<'_>) -> QueryResult<SphinxValue> {
    if ctx.bound_type.is_none() {
        return Err(ValidationError::AmbiguousRecordRef {
            key: key.to_string(),
        }
        .into());
    }
    i64::try_from(record.pk)
        .map(SphinxValue::Int)
        .map_err(|_| {
            ValidationError::ValueOutOfRange {
                key: key.to_string(),
            }
            .into()
        })
}
