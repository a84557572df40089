//! Query descriptor and statement compilation.
//!
//! # Responsibility
//! - Hold the canonical state of one query chain step.
//! - Render it into one select statement plus positional arguments.
//!
//! # Invariants
//! - Clause order is fixed: select list, `FROM`, `WHERE` (match, filters,
//!   excludes), `GROUP BY`, `ORDER BY`, `WITHIN GROUP ORDER BY`, `LIMIT`,
//!   `OPTION`.
//! - Match text is only ever a bound argument.
//! - Filter maps are shared between chain steps until one of them changes.

use super::clause::Clause;
use super::options::PassageOptions;
use crate::client::SqlValue;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Physical document id column; `pk` in orderings is rewritten to it.
pub const ID_FIELD: &str = "id";

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: String,
    pub descending: bool,
}

impl OrderTerm {
    /// Parses `-field` as descending and `field` as ascending.
    pub fn parse(term: &str) -> Self {
        let (field, descending) = match term.strip_prefix('-') {
            Some(field) => (field, true),
            None => (term, false),
        };
        let field = if field == "pk" { ID_FIELD } else { field };
        Self {
            field: field.to_string(),
            descending,
        }
    }
}

impl Display for OrderTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let dir = if self.descending { "DESC" } else { "ASC" };
        write!(f, "`{}` {dir}", self.field)
    }
}

/// A compiled statement ready for the daemon client.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

/// State of one query chain step.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub match_text: Option<String>,
    /// Explicit select list; `*` when `None`.
    pub fields: Option<Vec<String>>,
    /// Alias -> select expression.
    pub aliases: BTreeMap<String, String>,
    pub filters: Arc<BTreeMap<String, Clause>>,
    pub excludes: Arc<BTreeMap<String, Clause>>,
    pub group_by: Option<String>,
    pub order_by: Vec<OrderTerm>,
    pub group_order: Vec<OrderTerm>,
    pub offset: u64,
    pub limit: u64,
    /// Option name -> rendered `name=value`.
    pub options: BTreeMap<String, String>,
    pub collections: Arc<Vec<String>>,
    pub passages: bool,
    pub passage_options: PassageOptions,
}

impl QueryDescriptor {
    pub fn new(limit: u64, passages: bool) -> Self {
        Self {
            match_text: None,
            fields: None,
            aliases: BTreeMap::new(),
            filters: Arc::default(),
            excludes: Arc::default(),
            group_by: None,
            order_by: Vec::new(),
            group_order: Vec::new(),
            offset: 0,
            limit,
            options: BTreeMap::new(),
            collections: Arc::default(),
            passages,
            passage_options: PassageOptions::default(),
        }
    }

    /// Sets `offset = start` and `limit = stop - start` for the given bounds.
    ///
    /// Without `start`, `stop` is measured from the current offset.
    pub fn set_limits(&mut self, start: Option<u64>, stop: Option<u64>) {
        if let Some(start) = start {
            self.offset = start;
        }
        if let Some(stop) = stop {
            self.limit = stop.saturating_sub(self.offset);
        }
    }

    pub fn compile(&self) -> CompiledQuery {
        let mut args = Vec::new();
        let mut q = vec!["SELECT".to_string()];

        let mut select = match &self.fields {
            Some(fields) => vec![fields
                .iter()
                .map(|field| format!("`{field}`"))
                .collect::<Vec<_>>()
                .join(", ")],
            None => vec!["*".to_string()],
        };
        select.extend(
            self.aliases
                .iter()
                .map(|(alias, expr)| format!("{expr} AS `{alias}`")),
        );
        q.push(select.join(", "));

        q.push("FROM".to_string());
        q.push(self.collections.join(", "));

        let mut conditions = Vec::new();
        if let Some(text) = &self.match_text {
            conditions.push("MATCH(?)".to_string());
            args.push(SqlValue::Text(text.clone()));
        }
        conditions.extend(self.filters.values().map(ToString::to_string));
        conditions.extend(self.excludes.values().map(ToString::to_string));
        if !conditions.is_empty() {
            q.push("WHERE".to_string());
            q.push(conditions.join(" AND "));
        }

        if let Some(field) = &self.group_by {
            q.push(format!("GROUP BY `{field}`"));
        }
        if !self.order_by.is_empty() {
            q.push(format!("ORDER BY {}", join_terms(&self.order_by)));
        }
        if !self.group_order.is_empty() {
            q.push(format!(
                "WITHIN GROUP ORDER BY {}",
                join_terms(&self.group_order)
            ));
        }

        q.push(format!("LIMIT {}, {}", self.offset, self.limit));

        if !self.options.is_empty() {
            let options = self.options.values().cloned().collect::<Vec<_>>();
            q.push(format!("OPTION {}", options.join(",")));
        }

        CompiledQuery {
            sql: q.join(" "),
            args,
        }
    }
}

fn join_terms(terms: &[OrderTerm]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
