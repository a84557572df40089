mod common;

use common::idle_harness;
use sphinxql_core::{
    FilterValue, OptionValue, QueryError, RecordRef, SqlValue, UnsupportedError, ValidationError,
};

#[test]
fn articles_query_compiles_match_filter_order_and_limit() {
    let h = idle_harness();
    let qs = h
        .ctx
        .search_collections("articles")
        .query("django")
        .filter("status", 1)
        .unwrap()
        .order_by(&["-created"])
        .unwrap()
        .window(0, 2);

    let compiled = qs.query_string();
    assert!(compiled.sql.contains("FROM articles"));
    assert!(compiled.sql.contains("`status` = 1"));
    assert!(compiled.sql.contains("ORDER BY `created` DESC"));
    assert!(compiled.sql.contains("LIMIT 0, 2"));
    assert!(!compiled.sql.contains("django"));
    assert_eq!(compiled.args, vec![SqlValue::Text("django".to_string())]);
    assert!(h.client.executed.borrow().is_empty());
}

#[test]
fn chained_and_combined_filters_compile_to_the_same_clauses() {
    let h = idle_harness();
    let base = h.ctx.search_collections("articles");

    let chained = base
        .filter("status", 1)
        .unwrap()
        .filter("year__range", vec![2000, 2010])
        .unwrap();
    let combined = base
        .filter_all([
            ("year__range", FilterValue::from(vec![2000, 2010])),
            ("status", FilterValue::from(1)),
        ])
        .unwrap();

    assert_eq!(chained.descriptor().filters, combined.descriptor().filters);
    assert_eq!(chained.query_string(), combined.query_string());
}

#[test]
fn chain_operations_leave_the_receiver_untouched() {
    let h = idle_harness();
    let base = h.ctx.search_collections("articles");
    let filtered = base.filter("status", 1).unwrap().query("rust");

    assert!(base.descriptor().filters.is_empty());
    assert!(base.descriptor().match_text.is_none());
    assert_eq!(base.query_string().sql, "SELECT * FROM articles LIMIT 0, 20");
    assert_eq!(filtered.descriptor().filters.len(), 1);
}

#[test]
fn set_limits_and_window_compile_the_same_limit_clause() {
    let h = idle_harness();
    let base = h.ctx.search_collections("articles");

    let mut limited = base.all();
    limited.set_limits(Some(10), Some(15));
    let windowed = base.window(10, 15);

    assert!(limited.query_string().sql.ends_with("LIMIT 10, 5"));
    assert_eq!(limited.query_string(), windowed.query_string());
}

#[test]
fn set_limits_without_start_measures_stop_from_the_current_offset() {
    let h = idle_harness();
    let mut qs = h.ctx.search_collections("articles").window(10, 20);
    qs.set_limits(None, Some(15));
    assert!(qs.query_string().sql.ends_with("LIMIT 10, 5"));
}

#[test]
fn set_limits_invalidates_the_compiled_statement() {
    let h = idle_harness();
    let mut qs = h.ctx.search_collections("articles");
    assert!(qs.query_string().sql.ends_with("LIMIT 0, 20"));

    qs.set_limits(Some(5), None);
    assert!(qs.query_string().sql.ends_with("LIMIT 5, 20"));
}

#[test]
fn range_filter_rejects_every_cardinality_but_two() {
    let h = idle_harness();
    let qs = h.ctx.search_collections("articles");
    for count in [0usize, 1, 3, 4] {
        let values = (0..count as i64).collect::<Vec<_>>();
        let err = qs.filter("year__range", values).unwrap_err();
        assert!(
            matches!(
                err,
                QueryError::Validation(ValidationError::RangeCardinality { count: got, .. }) if got == count
            ),
            "count {count}: {err}"
        );
    }
}

#[test]
fn empty_in_list_is_rejected_for_filter_and_exclude() {
    let h = idle_harness();
    let qs = h.ctx.search_collections("articles");
    let err = qs.filter("tag__in", Vec::<i64>::new()).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Validation(ValidationError::EmptyList { .. })
    ));
    let err = qs.exclude("tag__in", Vec::<i64>::new()).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Validation(ValidationError::EmptyList { .. })
    ));
}

#[test]
fn excluding_a_range_is_best_effort_unless_strict() {
    let h = idle_harness();
    let qs = h
        .ctx
        .search_collections("articles")
        .exclude("year__range", vec![2000, 2010])
        .unwrap();
    assert!(qs
        .query_string()
        .sql
        .contains("NOT `year` BETWEEN 2000 AND 2010"));

    let strict = common::harness_with(
        sphinxql_core::SearchConfig {
            strict_range_exclude: true,
            ..Default::default()
        },
        common::ScriptedClient::new(common::meta(&[], 0), Vec::new()),
        common::RecordingStore::default(),
    );
    let err = strict
        .ctx
        .search_collections("articles")
        .exclude("year__range", vec![2000, 2010])
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Unsupported(UnsupportedError::ExcludeRange { .. })
    ));
}

#[test]
fn record_filters_need_a_bound_record_type() {
    let h = idle_harness();
    let author = RecordRef {
        record_type: "author".to_string(),
        pk: 7,
    };

    let bound = h
        .ctx
        .search("article")
        .unwrap()
        .filter("author", author.clone())
        .unwrap();
    assert!(bound.query_string().sql.contains("`author` = 7"));

    let err = h
        .ctx
        .search_collections("articles")
        .filter("author", author)
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Validation(ValidationError::AmbiguousRecordRef { .. })
    ));
}

#[test]
fn options_merge_by_key_across_calls() {
    let h = idle_harness();
    let qs = h
        .ctx
        .search_collections("articles")
        .set_options([("ranker", OptionValue::from("bm25"))])
        .unwrap()
        .set_options([
            ("ranker", OptionValue::from("none")),
            ("cutoff", OptionValue::from(100)),
        ])
        .unwrap();
    assert!(qs
        .query_string()
        .sql
        .ends_with("LIMIT 0, 20 OPTION cutoff=100,ranker=none"));
}

#[test]
fn select_list_grouping_and_group_order_render_in_place() {
    let h = idle_harness();
    let qs = h
        .ctx
        .search_collections("articles")
        .fields(&["id", "status"], &[("w", "WEIGHT()")])
        .unwrap()
        .group_by("author")
        .unwrap()
        .group_order(&["-pk"])
        .unwrap();
    assert_eq!(
        qs.query_string().sql,
        "SELECT `id`, `status`, WEIGHT() AS `w` FROM articles GROUP BY `author` \
         WITHIN GROUP ORDER BY `id` DESC LIMIT 0, 20"
    );
}

#[test]
fn unsafe_names_are_rejected_before_compilation() {
    let h = idle_harness();
    let qs = h.ctx.search_collections("articles");

    let err = qs.order_by(&["created; DROP"]).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Validation(ValidationError::InvalidIdentifier(_))
    ));
    let err = qs.fields(&[], &[("w", "'quoted'")]).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Validation(ValidationError::InvalidIdentifier(_))
    ));
    let err = qs.group_by("a-b").unwrap_err();
    assert!(matches!(
        err,
        QueryError::Validation(ValidationError::InvalidIdentifier(_))
    ));
}

#[test]
fn collections_are_normalized_and_deduplicated() {
    let h = idle_harness();
    let qs = h
        .ctx
        .search_collections("Articles, news")
        .add_collection("NEWS comments");
    assert_eq!(qs.collections(), ["articles", "news", "comments"]);
    assert!(qs.query_string().sql.contains("FROM articles, news, comments"));

    let trimmed = qs.remove_collection("news");
    assert_eq!(trimmed.collections(), ["articles", "comments"]);
}

#[test]
fn reset_keeps_binding_and_collections_only() {
    let h = idle_harness();
    let qs = h
        .ctx
        .search("article")
        .unwrap()
        .query("rust")
        .filter("status", 1)
        .unwrap()
        .window(5, 10)
        .reset();

    assert_eq!(qs.record_type().map(|rt| rt.name.as_str()), Some("article"));
    assert_eq!(qs.query_string().sql, "SELECT * FROM articles LIMIT 0, 20");
    assert!(qs.query_string().args.is_empty());
}

#[test]
fn unknown_record_type_is_reported() {
    let h = idle_harness();
    let err = h.ctx.search("author").unwrap_err();
    assert!(matches!(err, QueryError::UnknownRecordType(name) if name == "author"));
}
