//! Excerpt (passage) extraction for resolved records.
//!
//! # Responsibility
//! - Build one `CALL SNIPPETS` statement per record from its highlightable
//!   text fields.
//! - Map the daemon's highlighted texts back onto field names.
//!
//! # Invariants
//! - Field texts and the match text are bound arguments, never inlined.
//! - Only the collection name and validated options are inlined.

use super::builder::CompiledQuery;
use super::error::QueryResult;
use super::escape::quote_literal;
use super::options::PassageOptions;
use crate::client::{ClientError, SearchClient, SqlValue};
use crate::model::record::Record;
use crate::model::record_type::RecordType;
use log::debug;
use std::collections::BTreeMap;

/// Compiles the excerpt call for `record`; `None` when it has no text fields.
pub fn build_excerpt_call(
    record_type: &RecordType,
    record: &Record,
    match_text: &str,
    options: &PassageOptions,
) -> Option<CompiledQuery> {
    let fields = record_type.highlight_fields();
    if fields.is_empty() {
        return None;
    }

    let mut args = fields
        .iter()
        .map(|field| SqlValue::Text(record.text(field).unwrap_or_default().to_string()))
        .collect::<Vec<_>>();
    args.push(SqlValue::Text(match_text.to_string()));

    let placeholders = vec!["?"; fields.len()].join(", ");
    let sql = format!(
        "CALL SNIPPETS(({placeholders}), {}, ?{})",
        quote_literal(&record_type.collection),
        options.render()
    );
    Some(CompiledQuery { sql, args })
}

/// Fetches highlighted excerpts of `record`, keyed by field name.
pub fn fetch_passages(
    client: &dyn SearchClient,
    record_type: &RecordType,
    record: &Record,
    match_text: &str,
    options: &PassageOptions,
) -> QueryResult<BTreeMap<String, String>> {
    let Some(call) = build_excerpt_call(record_type, record, match_text, options) else {
        return Ok(BTreeMap::new());
    };

    let texts = client.call_snippets(&call.sql, &call.args)?;
    let fields = record_type.highlight_fields();
    if texts.len() != fields.len() {
        return Err(ClientError::MalformedResponse(format!(
            "excerpt call returned {} texts for {} fields",
            texts.len(),
            fields.len()
        ))
        .into());
    }

    debug!(
        "event=passages_fetch module=query status=ok record_type={} pk={} fields={}",
        record_type.name,
        record.pk,
        fields.len()
    );
    Ok(fields.iter().cloned().zip(texts).collect())
}

#[cfg(test)]
mod tests {
    use super::build_excerpt_call;
    use crate::client::SqlValue;
    use crate::model::record::{FieldValue, Record};
    use crate::model::record_type::{FieldKind, RecordType};
    use crate::query::options::{OptionValue, PassageOptions};

    #[test]
    fn excerpt_call_binds_texts_and_match() {
        let record_type = RecordType::new("articles", 1)
            .with_field("title", FieldKind::String)
            .with_field("status", FieldKind::UInt)
            .with_field("body", FieldKind::String);
        let record = Record::new("articles", 3)
            .with_value("title", FieldValue::Text("Hello".to_string()))
            .with_value("status", FieldValue::Int(1));
        let options = PassageOptions::new()
            .merged([("around", OptionValue::from(5))])
            .unwrap();

        let call = build_excerpt_call(&record_type, &record, "hel'lo", &options).unwrap();
        assert_eq!(
            call.sql,
            "CALL SNIPPETS((?, ?), 'articles', ?, '5' AS around)"
        );
        assert_eq!(
            call.args,
            vec![
                SqlValue::Text("Hello".to_string()),
                SqlValue::Text(String::new()),
                SqlValue::Text("hel'lo".to_string()),
            ]
        );
    }

    #[test]
    fn no_text_fields_means_no_call() {
        let record_type = RecordType::new("counters", 2).with_field("hits", FieldKind::UInt);
        let record = Record::new("counters", 1);
        assert!(build_excerpt_call(&record_type, &record, "x", &PassageOptions::new()).is_none());
    }
}
