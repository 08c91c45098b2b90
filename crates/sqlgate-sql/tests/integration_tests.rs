//! Integration tests for parsing, extraction, and normalization

use pretty_assertions::assert_eq;
use sqlgate_core::FullAst;
use sqlgate_sql::{normalize, SqlParser, TypeFilter};

fn statement_counts(sql: &str) -> (usize, usize) {
    let result = normalize(&SqlParser::new(), sql, &TypeFilter::default())
        .unwrap_or_else(|e| panic!("failed to parse {sql:?}: {e}"));
    let first = result.first_statement().map(|s| s.extracted.len()).unwrap_or(0);
    (result.statement_count(), first)
}

#[test]
fn statement_and_extraction_counts() {
    let cases = [
        ("SELECT * FROM app_tab LIMIT 10", (1, 1)),
        ("SELECT BENCHMARK(1000000,ENCODE('hello','goodbye'))", (1, 1)),
        ("SELECT * FROM app_tab LIMIT 10;SELECT * FROM app_tab LIMIT 10;", (2, 1)),
        (
            "UPDATE log SET k1=2 WHERE id IN (SELECT id FROM \
             (SELECT case WHEN id=2 THEN 3 ELSE 3 END AS uid FROM log) TEMP);",
            (1, 3),
        ),
        ("SELECT * FROM (SELECT * FROM table2) AS t;", (1, 2)),
        (
            "insert into app (name, description)
            values ('test i2', 'test i2');
            insert into app (name, description)
            values ('test i', 'test i');",
            (2, 1),
        ),
        ("explain select * from app_tab", (1, 1)),
    ];

    for (sql, expected) in cases {
        assert_eq!(statement_counts(sql), expected, "{sql}");
    }
}

#[test]
fn introspection_statements_normalize_without_extracted_nodes() {
    assert_eq!(statement_counts("desc app_tab"), (1, 0));
    assert_eq!(statement_counts("show create table app_tab"), (1, 0));
}

#[test]
fn full_ast_shape_follows_statement_count() {
    let parser = SqlParser::new();

    let single = normalize(&parser, "SELECT 1", &TypeFilter::default()).unwrap();
    assert!(matches!(single.full_ast, FullAst::Single(_)));

    let multiple = normalize(&parser, "SELECT 1; SELECT 2", &TypeFilter::default()).unwrap();
    assert_eq!(multiple.full_ast.len(), 2);
}

#[test]
fn canonical_statement_text_reparses() {
    let parser = SqlParser::new();
    let sql = "update log set k1 = 1 where id in (select id from log2 limit 5); \
               select a.id from app a join other b on a.id = b.id limit 3";

    let first = normalize(&parser, sql, &TypeFilter::default()).unwrap();
    for statement in &first.statements {
        let again = normalize(&parser, &statement.sql, &TypeFilter::default()).unwrap();
        let reparsed = again.first_statement().unwrap();

        assert_eq!(reparsed.sql, statement.sql);
        assert_eq!(reparsed.extracted, statement.extracted);
        assert_eq!(reparsed.table_list, statement.table_list);
    }
}

#[test]
fn table_and_column_lists() {
    let result = normalize(
        &SqlParser::new(),
        "SELECT u.name, o.total FROM shop.users u JOIN orders o ON u.id = o.user_id LIMIT 10",
        &TypeFilter::default(),
    )
    .unwrap();

    assert_eq!(
        result.full_table_list,
        vec!["select::shop::users", "select::null::orders"]
    );
    assert_eq!(
        result.full_column_list,
        vec![
            "select::u::name",
            "select::o::total",
            "select::u::id",
            "select::o::user_id",
        ]
    );
}

#[test]
fn custom_filter_collects_other_nodes() {
    let result = normalize(&SqlParser::new(), "DROP TABLE app_tab", &TypeFilter::Any).unwrap();
    let statement = result.first_statement().unwrap();

    assert_eq!(statement.extracted.len(), 1);
    assert_eq!(statement.extracted[0].type_tag(), "drop");
    assert_eq!(result.full_table_list, vec!["drop::null::app_tab"]);
}
