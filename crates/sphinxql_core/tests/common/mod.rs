#![allow(dead_code)]

use sphinxql_core::{
    ClientError, ClientResult, FieldKind, FieldValue, LocalId, Record, RecordStore, RecordType,
    RecordTypeRegistry, ResultMeta, RowCursor, SearchClient, SearchConfig, SearchContext,
    SqlValue, StoreResult, VecCursor,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::Arc;

pub type Call = (String, Vec<SqlValue>);

/// Daemon double answering every select with the same scripted rows.
pub struct ScriptedClient {
    meta: ResultMeta,
    rows: Vec<Vec<SqlValue>>,
    failure: Option<ClientError>,
    pub executed: RefCell<Vec<Call>>,
    pub snippet_calls: RefCell<Vec<Call>>,
    pub rows_read: Rc<Cell<usize>>,
}

impl ScriptedClient {
    pub fn new(meta: ResultMeta, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            meta,
            rows,
            failure: None,
            executed: RefCell::new(Vec::new()),
            snippet_calls: RefCell::new(Vec::new()),
            rows_read: Rc::new(Cell::new(0)),
        }
    }

    pub fn failing(error: ClientError) -> Self {
        let mut client = Self::new(ResultMeta::empty(), Vec::new());
        client.failure = Some(error);
        client
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .borrow()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }
}

struct CountingCursor {
    inner: VecCursor,
    read: Rc<Cell<usize>>,
}

impl RowCursor for CountingCursor {
    fn next_row(&mut self) -> ClientResult<Option<Vec<SqlValue>>> {
        let row = self.inner.next_row()?;
        if row.is_some() {
            self.read.set(self.read.get() + 1);
        }
        Ok(row)
    }
}

impl SearchClient for ScriptedClient {
    fn execute(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> ClientResult<(Box<dyn RowCursor>, ResultMeta)> {
        self.executed
            .borrow_mut()
            .push((sql.to_string(), args.to_vec()));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let cursor = CountingCursor {
            inner: VecCursor::new(self.rows.clone()),
            read: Rc::clone(&self.rows_read),
        };
        Ok((Box::new(cursor), self.meta.clone()))
    }

    /// Wraps every document argument in `<b>..</b>`.
    fn call_snippets(&self, sql: &str, args: &[SqlValue]) -> ClientResult<Vec<String>> {
        self.snippet_calls
            .borrow_mut()
            .push((sql.to_string(), args.to_vec()));
        let documents = &args[..args.len().saturating_sub(1)];
        Ok(documents
            .iter()
            .map(|arg| match arg {
                SqlValue::Text(text) => format!("<b>{text}</b>"),
                _ => String::new(),
            })
            .collect())
    }
}

/// In-memory store returning each batch in reverse id order.
#[derive(Default)]
pub struct RecordingStore {
    records: BTreeMap<String, BTreeMap<LocalId, Record>>,
    pub fetches: RefCell<Vec<(String, Vec<LocalId>)>>,
}

impl RecordingStore {
    pub fn with_record(mut self, record: Record) -> Self {
        self.records
            .entry(record.record_type.clone())
            .or_default()
            .insert(record.pk, record);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.borrow().len()
    }
}

impl RecordStore for RecordingStore {
    fn fetch_by_ids(
        &self,
        record_type: &RecordType,
        ids: &BTreeSet<LocalId>,
    ) -> StoreResult<Vec<Record>> {
        self.fetches
            .borrow_mut()
            .push((record_type.name.clone(), ids.iter().copied().collect()));
        let Some(stored) = self.records.get(&record_type.name) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| stored.get(id).cloned())
            .collect())
    }
}

pub fn article_type() -> RecordType {
    RecordType::new("article", 1)
        .with_collection("articles")
        .with_table("articles")
        .with_field("title", FieldKind::String)
        .with_field("body", FieldKind::String)
        .with_field("status", FieldKind::UInt)
}

pub fn news_type() -> RecordType {
    RecordType::new("news", 2).with_field("headline", FieldKind::String)
}

pub fn comment_type() -> RecordType {
    RecordType::new("comment", 3)
        .with_collection("comments")
        .with_field("text", FieldKind::String)
}

pub fn registry() -> RecordTypeRegistry {
    let mut registry = RecordTypeRegistry::new();
    registry.register(article_type()).unwrap();
    registry.register(news_type()).unwrap();
    registry.register(comment_type()).unwrap();
    registry
}

pub fn article(pk: LocalId, title: &str) -> Record {
    Record::new("article", pk)
        .with_value("title", FieldValue::Text(title.to_string()))
        .with_value("body", FieldValue::Text(format!("{title} body")))
        .with_value("status", FieldValue::Int(1))
}

pub fn news(pk: LocalId) -> Record {
    Record::new("news", pk).with_value("headline", FieldValue::Text(format!("news {pk}")))
}

pub fn comment(pk: LocalId) -> Record {
    Record::new("comment", pk).with_value("text", FieldValue::Text(format!("comment {pk}")))
}

/// Packed id with the default 24-bit shift.
pub fn doc_id(tag: u32, local_id: LocalId) -> i64 {
    ((i64::from(tag)) << 24) | local_id as i64
}

/// Metadata with `id` in column 0 followed by `extra` columns.
pub fn meta(extra: &[&str], total_found: u64) -> ResultMeta {
    let mut fields = BTreeMap::from([("id".to_string(), 0)]);
    for (index, name) in extra.iter().enumerate() {
        fields.insert((*name).to_string(), index + 1);
    }
    ResultMeta {
        fields,
        total_found,
    }
}

pub fn id_rows(ids: &[(u32, LocalId)]) -> Vec<Vec<SqlValue>> {
    ids.iter()
        .map(|(tag, local_id)| vec![SqlValue::Int(doc_id(*tag, *local_id))])
        .collect()
}

pub struct Harness {
    pub ctx: SearchContext,
    pub client: Arc<ScriptedClient>,
    pub store: Arc<RecordingStore>,
}

pub fn harness_with(config: SearchConfig, client: ScriptedClient, store: RecordingStore) -> Harness {
    let client = Arc::new(client);
    let store = Arc::new(store);
    let ctx = SearchContext::new(config, client.clone(), registry(), store.clone()).unwrap();
    Harness { ctx, client, store }
}

pub fn harness(client: ScriptedClient, store: RecordingStore) -> Harness {
    harness_with(SearchConfig::default(), client, store)
}

/// Harness whose daemon returns nothing.
pub fn idle_harness() -> Harness {
    harness(
        ScriptedClient::new(meta(&[], 0), Vec::new()),
        RecordingStore::default(),
    )
}
