//! SQLite-backed record store.
//!
//! # Invariants
//! - Table and column names come from registered record types, whose names
//!   the registry has already checked to be identifiers.
//! - Primary keys are bound through positional parameters.

use super::{RecordStore, StoreError, StoreResult};
use crate::codec::LocalId;
use crate::model::record::{FieldValue, Record};
use crate::model::record_type::{FieldKind, RecordType};
use log::debug;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeSet;

/// Record store reading declared fields straight from SQLite tables.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteRecordStore {
    fn fetch_by_ids(
        &self,
        record_type: &RecordType,
        ids: &BTreeSet<LocalId>,
    ) -> StoreResult<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let columns = selected_columns(record_type);
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" IN ({placeholders})",
            columns
                .iter()
                .map(|column| format!("\"{column}\""))
                .collect::<Vec<_>>()
                .join(", "),
            record_type.table,
            record_type.primary_key,
        );

        let bind_values = ids
            .iter()
            .map(|id| {
                i64::try_from(*id)
                    .map(Value::Integer)
                    .map_err(|_| StoreError::InvalidData(format!("primary key {id} overflows i64")))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::with_capacity(ids.len());

        while let Some(row) = rows.next()? {
            records.push(parse_record_row(record_type, &columns, row)?);
        }

        debug!(
            "event=store_fetch module=store status=ok record_type={} requested={} found={}",
            record_type.name,
            ids.len(),
            records.len()
        );
        Ok(records)
    }
}

fn selected_columns(record_type: &RecordType) -> Vec<&str> {
    let mut columns = vec![record_type.primary_key.as_str()];
    columns.extend(
        record_type
            .fields
            .iter()
            .map(|field| field.name.as_str())
            .filter(|name| *name != record_type.primary_key),
    );
    columns
}

fn parse_record_row(record_type: &RecordType, columns: &[&str], row: &Row<'_>) -> StoreResult<Record> {
    let pk_value: i64 = row.get(0)?;
    let pk = LocalId::try_from(pk_value).map_err(|_| {
        StoreError::InvalidData(format!(
            "negative primary key {pk_value} in {}.{}",
            record_type.table, record_type.primary_key
        ))
    })?;

    let mut record = Record::new(record_type.name.clone(), pk);
    for (index, column) in columns.iter().enumerate() {
        let kind = record_type
            .field(column)
            .map(|field| field.kind)
            .unwrap_or(FieldKind::UInt);
        let value = convert_value(row.get_ref(index)?, kind).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "column {}.{column} does not hold a {} value",
                record_type.table,
                kind.as_str()
            ))
        })?;
        record.values.insert((*column).to_string(), value);
    }
    Ok(record)
}

fn convert_value(value: ValueRef<'_>, kind: FieldKind) -> Option<FieldValue> {
    match (value, kind) {
        (ValueRef::Null, _) => Some(FieldValue::Null),
        (ValueRef::Integer(v), FieldKind::Bool) => Some(FieldValue::Bool(v != 0)),
        (ValueRef::Integer(v), FieldKind::Float) => Some(FieldValue::Float(v as f64)),
        (ValueRef::Integer(v), _) => Some(FieldValue::Int(v)),
        (ValueRef::Real(v), _) => Some(FieldValue::Float(v)),
        (ValueRef::Text(bytes), _) => std::str::from_utf8(bytes)
            .ok()
            .map(|text| FieldValue::Text(text.to_string())),
        (ValueRef::Blob(_), _) => None,
    }
}
