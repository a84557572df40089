//! Escaping and name validation for inlined statement fragments.
//!
//! # Invariants
//! - Names inlined into statements are checked here first.
//! - Free text only reaches a statement through `escape`/`quote_literal`
//!   or as a bound argument.

use once_cell::sync::Lazy;
use regex::Regex;

static RESERVED_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([=()|\-!@~"&/\\^$])"#).expect("valid reserved chars regex"));
static COLLECTION_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[^a-z0-9_-]+").expect("valid collection split regex"));
static SELECT_EXPR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_@(),.+\-*/<>=! ]+$").expect("valid select expression regex")
});

/// Backslash-escapes the daemon's reserved match-syntax characters.
pub fn escape(value: &str) -> String {
    RESERVED_CHARS_RE.replace_all(value, r"\${1}").into_owned()
}

/// Escapes `value` and wraps it in single quotes for inlining.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape(value).replace('\'', "\\'"))
}

/// Splits a collection list on any non `[a-z0-9_-]` run and lower-cases it.
pub fn parse_collections(list: &str) -> Vec<String> {
    COLLECTION_SPLIT_RE
        .split(list)
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// `[A-Za-z0-9_]+`, the only shape inlined into statements as a name.
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Select-list expressions: operators, calls and names, no quotes or `;`.
pub(crate) fn is_select_expression(value: &str) -> bool {
    SELECT_EXPR_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::{escape, is_identifier, is_select_expression, parse_collections, quote_literal};

    #[test]
    fn escape_prefixes_every_reserved_char() {
        assert_eq!(escape("a-b"), r"a\-b");
        assert_eq!(
            escape(r#"=()|-!@~"&/\^$"#),
            r#"\=\(\)\|\-\!\@\~\"\&\/\\\^\$"#
        );
        assert_eq!(escape("plain text"), "plain text");
    }

    #[test]
    fn quote_literal_escapes_single_quotes() {
        assert_eq!(quote_literal("<b>"), "'<b>'");
        assert_eq!(quote_literal("it's"), r"'it\'s'");
    }

    #[test]
    fn parse_collections_splits_and_lowercases() {
        assert_eq!(
            parse_collections("Articles, comments;;news-2"),
            ["articles", "comments", "news-2"]
        );
        assert!(parse_collections("  ").is_empty());
    }

    #[test]
    fn identifiers_and_expressions() {
        assert!(is_identifier("created_at"));
        assert!(!is_identifier("created at"));
        assert!(!is_identifier("`x`"));
        assert!(is_select_expression("IF(status>1, 1, 0)"));
        assert!(is_select_expression("@weight"));
        assert!(!is_select_expression("1; DROP"));
        assert!(!is_select_expression("'x'"));
    }
}
