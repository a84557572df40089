//! `OPTION` clause and excerpt option tables.
//!
//! # Invariants
//! - Only keys from the fixed tables are rendered; other keys are ignored.
//! - A known key with the wrong value kind is rejected.
//! - String values are escaped and quoted; weight names must be identifiers.

use super::error::{QueryResult, ValidationError};
use super::escape::{is_identifier, quote_literal};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Ranking modes accepted by the `ranker` option.
pub const RANKERS: &[&str] = &[
    "proximity_bm25",
    "bm25",
    "none",
    "wordcount",
    "proximity",
    "matchany",
    "fieldmask",
    "sph04",
    "expr",
    "export",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Str,
    Weights,
}

impl OptionKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "a boolean",
            Self::Int => "an integer",
            Self::Str => "a string",
            Self::Weights => "a weight map",
        }
    }
}

const QUERY_OPTIONS: &[(&str, OptionKind)] = &[
    ("ranker", OptionKind::Str),
    ("max_matches", OptionKind::Int),
    ("cutoff", OptionKind::Int),
    ("max_query_time", OptionKind::Int),
    ("retry_count", OptionKind::Int),
    ("retry_delay", OptionKind::Int),
    ("field_weights", OptionKind::Weights),
    ("index_weights", OptionKind::Weights),
    ("reverse_scan", OptionKind::Bool),
    ("comment", OptionKind::Str),
];

const PASSAGE_OPTIONS: &[(&str, OptionKind)] = &[
    ("before_match", OptionKind::Str),
    ("after_match", OptionKind::Str),
    ("chunk_separator", OptionKind::Str),
    ("html_strip_mode", OptionKind::Str),
    ("passage_boundary", OptionKind::Str),
    ("limit", OptionKind::Int),
    ("around", OptionKind::Int),
    ("limit_passages", OptionKind::Int),
    ("limit_words", OptionKind::Int),
    ("start_passage_id", OptionKind::Int),
    ("exact_phrase", OptionKind::Bool),
    ("single_passage", OptionKind::Bool),
    ("use_boundaries", OptionKind::Bool),
    ("weight_order", OptionKind::Bool),
    ("query_mode", OptionKind::Bool),
    ("force_all_words", OptionKind::Bool),
    ("load_files", OptionKind::Bool),
    ("load_files_scattered", OptionKind::Bool),
    ("allow_empty", OptionKind::Bool),
    ("emit_zones", OptionKind::Bool),
];

/// Caller-supplied option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Weights(BTreeMap<String, i64>),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::Bool(_) => OptionKind::Bool,
            Self::Int(_) => OptionKind::Int,
            Self::Str(_) => OptionKind::Str,
            Self::Weights(_) => OptionKind::Weights,
        }
    }
}

impl Display for OptionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", i64::from(*value)),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
            Self::Weights(weights) => {
                let pairs = weights
                    .iter()
                    .map(|(name, weight)| format!("{name}={weight}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({pairs})")
            }
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<BTreeMap<String, i64>> for OptionValue {
    fn from(value: BTreeMap<String, i64>) -> Self {
        Self::Weights(value)
    }
}

impl<const N: usize> From<[(&str, i64); N]> for OptionValue {
    fn from(value: [(&str, i64); N]) -> Self {
        Self::Weights(
            value
                .into_iter()
                .map(|(name, weight)| (name.to_string(), weight))
                .collect(),
        )
    }
}

fn lookup_kind(table: &[(&str, OptionKind)], name: &str) -> Option<OptionKind> {
    table
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, kind)| *kind)
}

fn check_kind(name: &str, expected: OptionKind, value: &OptionValue) -> QueryResult<()> {
    if value.kind() != expected {
        return Err(ValidationError::InvalidOption {
            name: name.to_string(),
            reason: format!("expects {}", expected.as_str()),
        }
        .into());
    }
    Ok(())
}

/// Validates and renders query options as `name -> "name=value"`.
///
/// Unknown option names are skipped.
pub(crate) fn render_query_options<K, V, I>(options: I) -> QueryResult<BTreeMap<String, String>>
where
    K: AsRef<str>,
    V: Into<OptionValue>,
    I: IntoIterator<Item = (K, V)>,
{
    let mut rendered = BTreeMap::new();
    for (name, value) in options {
        let name = name.as_ref();
        let Some(kind) = lookup_kind(QUERY_OPTIONS, name) else {
            continue;
        };
        let value = value.into();
        check_kind(name, kind, &value)?;

        let value = match (name, &value) {
            ("ranker", OptionValue::Str(ranker)) => {
                if !RANKERS.contains(&ranker.as_str()) {
                    return Err(ValidationError::InvalidOption {
                        name: name.to_string(),
                        reason: format!("has unknown ranker `{ranker}`"),
                    }
                    .into());
                }
                ranker.clone()
            }
            (_, OptionValue::Str(text)) => quote_literal(text),
            (_, OptionValue::Weights(weights)) => {
                if let Some(bad) = weights.keys().find(|key| !is_identifier(key)) {
                    return Err(ValidationError::InvalidIdentifier(bad.clone()).into());
                }
                value.to_string()
            }
            _ => value.to_string(),
        };
        rendered.insert(name.to_string(), format!("{name}={value}"));
    }
    Ok(rendered)
}

/// Validated excerpt options, rendered after the match argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassageOptions {
    values: BTreeMap<String, OptionValue>,
}

impl PassageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `options` into a copy of `self`.
    ///
    /// Unknown option names are skipped; booleans are stored as 0/1.
    pub fn merged<K, V, I>(&self, options: I) -> QueryResult<Self>
    where
        K: AsRef<str>,
        V: Into<OptionValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut values = self.values.clone();
        for (name, value) in options {
            let name = name.as_ref();
            let Some(kind) = lookup_kind(PASSAGE_OPTIONS, name) else {
                continue;
            };
            let value = value.into();
            check_kind(name, kind, &value)?;
            let value = match value {
                OptionValue::Bool(flag) => OptionValue::Int(i64::from(flag)),
                other => other,
            };
            values.insert(name.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// `, 'value' AS name` for every option, or an empty string.
    pub fn render(&self) -> String {
        self.values
            .iter()
            .map(|(name, value)| format!(", {} AS {name}", quote_literal(&value.to_string())))
            .collect()
    }
}
