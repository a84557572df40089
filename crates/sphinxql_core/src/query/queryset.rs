//! Lazy, chainable search query and its result cache.
//!
//! # Responsibility
//! - Expose clone-returning chain operations over a `QueryDescriptor`.
//! - Execute once on first data access, then stitch daemon rows back onto
//!   application records in the daemon's row order.
//!
//! # Invariants
//! - Chain operations never touch the receiver; derived queries start with
//!   no compiled statement and no result cache.
//! - Record lookups are batched per collection tag and run sequentially.
//! - The row cursor is dropped as soon as it reports exhaustion.
//! - The empty variant never calls a collaborator.

use super::builder::{CompiledQuery, OrderTerm, QueryDescriptor, ID_FIELD};
use super::clause::{compile_lookup, CompileContext};
use super::error::{QueryError, QueryResult, ValidationError};
use super::escape::{is_identifier, is_select_expression, parse_collections};
use super::options::{render_query_options, OptionValue};
use super::passages::fetch_passages;
use super::value::FilterValue;
use crate::client::{ClientError, ResultMeta, RowCursor, SqlValue};
use crate::codec::{CollectionTag, DocumentIdCodec, LocalId};
use crate::context::SearchContext;
use crate::model::record::Record;
use crate::model::record_type::RecordType;
use log::{debug, error, info, warn};
use once_cell::unsync::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// One resolved result row.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: Arc<Record>,
    /// Raw packed identifier as returned by the daemon.
    pub document_id: u64,
    pub tag: CollectionTag,
    /// Daemon columns other than `id`, by name.
    pub fields: BTreeMap<String, SqlValue>,
    /// Highlighted excerpts by field name, when passages are enabled.
    pub passages: Option<BTreeMap<String, String>>,
}

struct PendingRow {
    document_id: u64,
    local_id: LocalId,
    tag: CollectionTag,
    fields: BTreeMap<String, SqlValue>,
}

type ResolvedRecords = HashMap<(CollectionTag, LocalId), (Arc<RecordType>, Arc<Record>)>;

struct ResultCache {
    meta: ResultMeta,
    cursor: Option<Box<dyn RowCursor>>,
    hits: Vec<SearchHit>,
    seen: HashSet<u64>,
}

impl ResultCache {
    fn new(meta: ResultMeta, cursor: Option<Box<dyn RowCursor>>) -> Self {
        Self {
            meta,
            cursor,
            hits: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    /// Reads up to `wanted` rows with a not yet seen document id.
    fn read_rows(
        &mut self,
        codec: &DocumentIdCodec,
        wanted: Option<usize>,
    ) -> QueryResult<Vec<PendingRow>> {
        let mut pending = Vec::new();
        let mut exhausted = false;

        if let Some(cursor) = self.cursor.as_mut() {
            while wanted.map_or(true, |wanted| pending.len() < wanted) {
                let Some(row) = cursor.next_row()? else {
                    exhausted = true;
                    break;
                };
                let document_id = decode_document_id(&self.meta, &row)?;
                if !self.seen.insert(document_id) {
                    continue;
                }
                let (local_id, tag) = codec.unpack(document_id);
                let fields = self
                    .meta
                    .fields
                    .iter()
                    .filter(|(name, _)| name.as_str() != ID_FIELD)
                    .map(|(name, position)| {
                        let value = row.get(*position).cloned().unwrap_or(SqlValue::Null);
                        (name.clone(), value)
                    })
                    .collect();
                pending.push(PendingRow {
                    document_id,
                    local_id,
                    tag,
                    fields,
                });
            }
        }

        if exhausted {
            self.cursor = None;
        }
        Ok(pending)
    }
}

fn decode_document_id(meta: &ResultMeta, row: &[SqlValue]) -> QueryResult<u64> {
    let position = meta.fields.get(ID_FIELD).copied().ok_or_else(|| {
        ClientError::MalformedResponse("result set has no `id` column".to_string())
    })?;
    row.get(position)
        .and_then(SqlValue::as_i64)
        .and_then(|id| u64::try_from(id).ok())
        .ok_or_else(|| {
            ClientError::MalformedResponse(format!(
                "row has no valid document id at column {position}"
            ))
            .into()
        })
}

/// Lazily executed search over one or more collections.
pub struct QuerySet {
    ctx: SearchContext,
    record_type: Option<Arc<RecordType>>,
    descriptor: QueryDescriptor,
    empty: bool,
    compiled: OnceCell<CompiledQuery>,
    results: Option<ResultCache>,
}

impl QuerySet {
    /// Unbound query over a collection list such as `"articles news"`.
    pub fn new(ctx: SearchContext, collections: &str) -> Self {
        let mut descriptor = QueryDescriptor::new(ctx.config().default_limit, ctx.config().passages);
        descriptor.collections = Arc::new(merge_collections(&[], collections));
        Self::from_parts(ctx, None, descriptor, false)
    }

    /// Query bound to `record_type` over its collection.
    pub fn for_record_type(ctx: SearchContext, record_type: Arc<RecordType>) -> Self {
        let mut descriptor = QueryDescriptor::new(ctx.config().default_limit, ctx.config().passages);
        descriptor.collections = Arc::new(vec![record_type.collection.clone()]);
        Self::from_parts(ctx, Some(record_type), descriptor, false)
    }

    fn from_parts(
        ctx: SearchContext,
        record_type: Option<Arc<RecordType>>,
        descriptor: QueryDescriptor,
        empty: bool,
    ) -> Self {
        Self {
            ctx,
            record_type,
            descriptor,
            empty,
            compiled: OnceCell::new(),
            results: None,
        }
    }

    fn derive(&self, descriptor: QueryDescriptor) -> Self {
        Self::from_parts(
            self.ctx.clone(),
            self.record_type.clone(),
            descriptor,
            self.empty,
        )
    }

    fn compile_context(&self) -> CompileContext<'_> {
        CompileContext {
            bound_type: self.record_type.as_ref().map(|record_type| record_type.name.as_str()),
            strict_range_exclude: self.ctx.config().strict_range_exclude,
        }
    }

    pub fn record_type(&self) -> Option<&Arc<RecordType>> {
        self.record_type.as_ref()
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn collections(&self) -> &[String] {
        &self.descriptor.collections
    }

    /// Fresh copy with the same state and no cached results.
    pub fn all(&self) -> Self {
        self.derive(self.descriptor.clone())
    }

    /// Copy that yields nothing and never contacts the daemon.
    pub fn none(&self) -> Self {
        let mut qs = self.all();
        qs.empty = true;
        qs
    }

    /// Same binding and collections, every other setting back to defaults.
    pub fn reset(&self) -> Self {
        let config = self.ctx.config();
        let mut descriptor = QueryDescriptor::new(config.default_limit, config.passages);
        descriptor.collections = Arc::clone(&self.descriptor.collections);
        Self::from_parts(self.ctx.clone(), self.record_type.clone(), descriptor, false)
    }

    /// Sets the free-text match expression; it is always sent as an argument.
    pub fn query(&self, text: &str) -> Self {
        let mut descriptor = self.descriptor.clone();
        descriptor.match_text = Some(text.to_string());
        self.derive(descriptor)
    }

    pub fn filter(&self, key: &str, value: impl Into<FilterValue>) -> QueryResult<Self> {
        self.filter_all([(key, value.into())])
    }

    /// Adds several filter lookups at once, e.g. `[("status", 1.into())]`.
    pub fn filter_all<K, V, I>(&self, lookups: I) -> QueryResult<Self>
    where
        K: AsRef<str>,
        V: Into<FilterValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.with_lookups(lookups, false)
    }

    pub fn exclude(&self, key: &str, value: impl Into<FilterValue>) -> QueryResult<Self> {
        self.exclude_all([(key, value.into())])
    }

    pub fn exclude_all<K, V, I>(&self, lookups: I) -> QueryResult<Self>
    where
        K: AsRef<str>,
        V: Into<FilterValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.with_lookups(lookups, true)
    }

    fn with_lookups<K, V, I>(&self, lookups: I, exclude: bool) -> QueryResult<Self>
    where
        K: AsRef<str>,
        V: Into<FilterValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let ctx = self.compile_context();
        let mut clauses = Vec::new();
        for (key, value) in lookups {
            let key = key.as_ref();
            clauses.push((key.to_string(), compile_lookup(key, &value.into(), exclude, &ctx)?));
        }

        let mut descriptor = self.descriptor.clone();
        if !clauses.is_empty() {
            let target = if exclude {
                Arc::make_mut(&mut descriptor.excludes)
            } else {
                Arc::make_mut(&mut descriptor.filters)
            };
            target.extend(clauses);
        }
        Ok(self.derive(descriptor))
    }

    /// Replaces the select list and aliases; no names selects `*`.
    pub fn fields(&self, names: &[&str], aliases: &[(&str, &str)]) -> QueryResult<Self> {
        check_identifiers(names.iter().copied())?;
        let mut rendered = BTreeMap::new();
        for (alias, expression) in aliases {
            check_identifiers([*alias])?;
            if !is_select_expression(expression) {
                return Err(ValidationError::InvalidIdentifier((*expression).to_string()).into());
            }
            rendered.insert((*alias).to_string(), (*expression).to_string());
        }

        let mut descriptor = self.descriptor.clone();
        descriptor.fields = if names.is_empty() {
            None
        } else {
            Some(names.iter().map(|name| (*name).to_string()).collect())
        };
        descriptor.aliases = rendered;
        Ok(self.derive(descriptor))
    }

    pub fn group_by(&self, field: &str) -> QueryResult<Self> {
        check_identifiers([field])?;
        let mut descriptor = self.descriptor.clone();
        descriptor.group_by = Some(field.to_string());
        Ok(self.derive(descriptor))
    }

    /// Replaces the ordering; `-field` sorts descending, `pk` means `id`.
    pub fn order_by(&self, terms: &[&str]) -> QueryResult<Self> {
        let mut descriptor = self.descriptor.clone();
        descriptor.order_by = parse_terms(terms)?;
        Ok(self.derive(descriptor))
    }

    /// Replaces the `WITHIN GROUP ORDER BY` terms.
    pub fn group_order(&self, terms: &[&str]) -> QueryResult<Self> {
        let mut descriptor = self.descriptor.clone();
        descriptor.group_order = parse_terms(terms)?;
        Ok(self.derive(descriptor))
    }

    /// Merges `OPTION` clause entries by key.
    pub fn set_options<K, V, I>(&self, options: I) -> QueryResult<Self>
    where
        K: AsRef<str>,
        V: Into<OptionValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let rendered = render_query_options(options)?;
        let mut descriptor = self.descriptor.clone();
        descriptor.options.extend(rendered);
        Ok(self.derive(descriptor))
    }

    /// Toggles excerpts and merges excerpt options by key.
    pub fn set_passages<K, V, I>(&self, enable: bool, options: I) -> QueryResult<Self>
    where
        K: AsRef<str>,
        V: Into<OptionValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut descriptor = self.descriptor.clone();
        descriptor.passages = enable;
        descriptor.passage_options = descriptor.passage_options.merged(options)?;
        Ok(self.derive(descriptor))
    }

    pub fn add_collection(&self, collections: &str) -> Self {
        let mut descriptor = self.descriptor.clone();
        descriptor.collections = Arc::new(merge_collections(&descriptor.collections, collections));
        self.derive(descriptor)
    }

    pub fn remove_collection(&self, collections: &str) -> Self {
        let removed = parse_collections(collections);
        let mut descriptor = self.descriptor.clone();
        descriptor.collections = Arc::new(
            descriptor
                .collections
                .iter()
                .filter(|name| !removed.contains(name))
                .cloned()
                .collect(),
        );
        self.derive(descriptor)
    }

    /// Copy limited to rows `start..stop`; nothing is executed.
    pub fn window(&self, start: usize, stop: usize) -> Self {
        let mut descriptor = self.descriptor.clone();
        descriptor.set_limits(Some(start as u64), Some(stop as u64));
        self.derive(descriptor)
    }

    /// Changes pagination in place, dropping the compiled statement and
    /// any fetched rows.
    ///
    /// A missing `start` keeps the current offset, so `stop` stays an
    /// absolute row position: `window(10, 20)` then `set_limits(None,
    /// Some(15))` asks for rows 10..15.
    pub fn set_limits(&mut self, start: Option<u64>, stop: Option<u64>) {
        self.descriptor.set_limits(start, stop);
        self.compiled = OnceCell::new();
        self.results = None;
    }

    /// Compiled statement, built once per query object.
    pub fn query_string(&self) -> &CompiledQuery {
        self.compiled.get_or_init(|| {
            let compiled = self.descriptor.compile();
            debug!(
                "event=query_compile module=query status=ok collections={} args={} sql={}",
                self.descriptor.collections.join(","),
                compiled.args.len(),
                compiled.sql
            );
            compiled
        })
    }

    /// Result metadata; executes the query without resolving rows.
    pub fn meta(&mut self) -> QueryResult<&ResultMeta> {
        Ok(&self.materialize(Some(0))?.meta)
    }

    /// Total matches reported by the daemon, capped at `max_matches`.
    pub fn count(&mut self) -> QueryResult<u64> {
        let total_found = self.materialize(Some(0))?.meta.total_found;
        Ok(total_found.min(self.ctx.config().max_matches))
    }

    /// Every resolved row, draining the cursor.
    pub fn rows(&mut self) -> QueryResult<&[SearchHit]> {
        Ok(&self.materialize(None)?.hits)
    }

    /// Row at `index`.
    ///
    /// A query that has not run yet fetches only that row through a
    /// one-row window; otherwise the cache is filled up to `index`.
    pub fn get(&mut self, index: usize) -> QueryResult<SearchHit> {
        if self.results.is_none() {
            let mut window = self.window(index, index.saturating_add(1));
            if let Some(hit) = window.rows()?.first().cloned() {
                return Ok(hit);
            }
            let len = usize::try_from(window.count()?).unwrap_or(usize::MAX);
            return Err(ValidationError::IndexOutOfRange { index, len }.into());
        }

        let cache = self.materialize(Some(index.saturating_add(1)))?;
        cache.hits.get(index).cloned().ok_or_else(|| {
            ValidationError::IndexOutOfRange {
                index,
                len: cache.hits.len(),
            }
            .into()
        })
    }

    /// Rows `start..stop`, clipped to what exists.
    pub fn slice(&mut self, start: usize, stop: usize) -> QueryResult<Vec<SearchHit>> {
        if stop <= start {
            return Ok(Vec::new());
        }
        if self.results.is_none() {
            return self.window(start, stop).into_hits();
        }

        let cache = self.materialize(Some(stop))?;
        let end = stop.min(cache.hits.len());
        Ok(cache
            .hits
            .get(start..end)
            .map(<[SearchHit]>::to_vec)
            .unwrap_or_default())
    }

    pub fn into_hits(mut self) -> QueryResult<Vec<SearchHit>> {
        self.materialize(None)?;
        Ok(self.results.map(|cache| cache.hits).unwrap_or_default())
    }

    fn materialize(&mut self, wanted: Option<usize>) -> QueryResult<&mut ResultCache> {
        let mut cache = match self.results.take() {
            Some(cache) => cache,
            None => self.execute()?,
        };
        // A failed fill drops the cache, so the next access re-executes.
        self.fill(&mut cache, wanted)?;
        Ok(self.results.insert(cache))
    }

    fn execute(&self) -> QueryResult<ResultCache> {
        if self.empty {
            return Ok(ResultCache::new(ResultMeta::empty(), None));
        }
        if self.descriptor.collections.is_empty() {
            return Err(ValidationError::NoCollections.into());
        }

        let compiled = self.query_string();
        let collections = self.descriptor.collections.join(",");
        let started = Instant::now();
        let (cursor, meta) = match self.ctx.client().execute(&compiled.sql, &compiled.args) {
            Ok(result) => result,
            Err(err) => {
                error!(
                    "event=query_execute module=query status=error collections={} duration_ms={} error={}",
                    collections,
                    started.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };
        info!(
            "event=query_execute module=query status=ok collections={} duration_ms={} total_found={}",
            collections,
            started.elapsed().as_millis(),
            meta.total_found
        );
        Ok(ResultCache::new(meta, Some(cursor)))
    }

    fn fill(&self, cache: &mut ResultCache, wanted: Option<usize>) -> QueryResult<()> {
        loop {
            if cache.is_exhausted() {
                return Ok(());
            }
            let missing = match wanted {
                Some(target) if cache.hits.len() >= target => return Ok(()),
                Some(target) => Some(target - cache.hits.len()),
                None => None,
            };

            let pending = cache.read_rows(self.ctx.codec(), missing)?;
            if pending.is_empty() {
                continue;
            }
            let resolved = self.resolve_records(&pending)?;

            let mut batch = Vec::with_capacity(pending.len());
            for row in pending {
                let Some((record_type, record)) = resolved.get(&(row.tag, row.local_id)) else {
                    warn!(
                        "event=record_missing module=query status=warn tag={} local_id={}",
                        row.tag, row.local_id
                    );
                    continue;
                };
                let passages = if self.descriptor.passages {
                    Some(match &self.descriptor.match_text {
                        Some(text) => fetch_passages(
                            self.ctx.client(),
                            record_type,
                            record,
                            text,
                            &self.descriptor.passage_options,
                        )?,
                        None => BTreeMap::new(),
                    })
                } else {
                    None
                };
                batch.push(SearchHit {
                    record: Arc::clone(record),
                    document_id: row.document_id,
                    tag: row.tag,
                    fields: row.fields,
                    passages,
                });
            }
            cache.hits.extend(batch);
        }
    }

    /// Batch-fetches the records behind `pending`, keyed by `(tag, local id)`.
    fn resolve_records(&self, pending: &[PendingRow]) -> QueryResult<ResolvedRecords> {
        let mut by_tag: BTreeMap<CollectionTag, BTreeSet<LocalId>> = BTreeMap::new();
        for row in pending {
            by_tag.entry(row.tag).or_default().insert(row.local_id);
        }

        let mut resolved = HashMap::new();
        if let Some(record_type) = &self.record_type {
            let ids = by_tag.values().flatten().copied().collect::<BTreeSet<_>>();
            for record in self.fetch_batch(record_type, &ids)? {
                for (tag, tag_ids) in &by_tag {
                    if tag_ids.contains(&record.pk) {
                        resolved.insert(
                            (*tag, record.pk),
                            (Arc::clone(record_type), Arc::clone(&record)),
                        );
                    }
                }
            }
            return Ok(resolved);
        }

        let batches = by_tag
            .iter()
            .map(|(tag, ids)| {
                self.ctx
                    .registry()
                    .by_tag(*tag)
                    .map(|record_type| (*tag, record_type, ids))
                    .ok_or(QueryError::Resolution { tag: *tag })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        for (tag, record_type, ids) in batches {
            for record in self.fetch_batch(&record_type, ids)? {
                resolved.insert((tag, record.pk), (Arc::clone(&record_type), record));
            }
        }
        Ok(resolved)
    }

    fn fetch_batch(
        &self,
        record_type: &RecordType,
        ids: &BTreeSet<LocalId>,
    ) -> QueryResult<Vec<Arc<Record>>> {
        let started = Instant::now();
        let records = self.ctx.store().fetch_by_ids(record_type, ids)?;
        debug!(
            "event=batch_fetch module=query status=ok record_type={} requested={} count={} duration_ms={}",
            record_type.name,
            ids.len(),
            records.len(),
            started.elapsed().as_millis()
        );
        Ok(records.into_iter().map(Arc::new).collect())
    }
}

impl Clone for QuerySet {
    fn clone(&self) -> Self {
        self.all()
    }
}

impl Debug for QuerySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySet")
            .field(
                "record_type",
                &self.record_type.as_ref().map(|record_type| &record_type.name),
            )
            .field("descriptor", &self.descriptor)
            .field("empty", &self.empty)
            .field("executed", &self.results.is_some())
            .finish()
    }
}

fn check_identifiers<'a>(names: impl IntoIterator<Item = &'a str>) -> QueryResult<()> {
    for name in names {
        if !is_identifier(name) {
            return Err(ValidationError::InvalidIdentifier(name.to_string()).into());
        }
    }
    Ok(())
}

fn parse_terms(terms: &[&str]) -> QueryResult<Vec<OrderTerm>> {
    terms
        .iter()
        .map(|term| -> QueryResult<OrderTerm> {
            let term = OrderTerm::parse(term);
            check_identifiers([term.field.as_str()])?;
            Ok(term)
        })
        .collect()
}

fn merge_collections(current: &[String], collections: &str) -> Vec<String> {
    let mut merged = current.to_vec();
    for name in parse_collections(collections) {
        if !merged.contains(&name) {
            merged.push(name);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::{decode_document_id, merge_collections};
    use crate::client::{ResultMeta, SqlValue};
    use std::collections::BTreeMap;

    #[test]
    fn document_id_is_read_from_the_id_column() {
        let meta = ResultMeta {
            fields: BTreeMap::from([("w".to_string(), 0), ("id".to_string(), 1)]),
            total_found: 1,
        };
        let id = decode_document_id(&meta, &[SqlValue::Int(7), SqlValue::Int(42)]).unwrap();
        assert_eq!(id, 42);
        assert!(decode_document_id(&meta, &[SqlValue::Int(7), SqlValue::Int(-1)]).is_err());
        assert!(decode_document_id(&meta, &[SqlValue::Int(7)]).is_err());
    }

    #[test]
    fn merged_collections_keep_first_position() {
        let current = vec!["news".to_string()];
        assert_eq!(
            merge_collections(&current, "articles,NEWS"),
            ["news", "articles"]
        );
    }
}
