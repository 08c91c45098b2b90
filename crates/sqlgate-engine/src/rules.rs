//! Built-in structural rules
//!
//! Every rule is a total function over the extracted statement nodes of one
//! statement and its table list. Node kinds a rule does not inspect pass
//! vacuously, so an empty node list passes every rule.

use serde::Serialize;
use sqlgate_core::{Node, RuleId, RuleSettings, SelectNode};

/// Result of running one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub passed: bool,

    /// Message to report when the rule did not pass
    pub message: String,
}

impl RuleOutcome {
    fn new(passed: bool, message: impl Into<String>) -> Self {
        Self {
            passed,
            message: message.into(),
        }
    }
}

/// Run `rule` against one statement
pub fn check(
    rule: RuleId,
    nodes: &[Node],
    table_list: &[String],
    settings: &RuleSettings,
) -> RuleOutcome {
    match rule {
        RuleId::NotOrderBy => not_order_by(nodes),
        RuleId::NotGroupBy => not_group_by(nodes),
        RuleId::NotHaving => not_having(nodes),
        RuleId::LimitForAllSelectQuery => limit_for_all_select_query(nodes),
        RuleId::LimitNumForAllSelectQuery => limit_num_for_all_select_query(nodes, settings),
        RuleId::HasWhereForTypesInNeed => has_where_for_types_in_need(nodes, settings),
        RuleId::NotForbiddenFunc => not_forbidden_func(nodes, settings),
        RuleId::IsSystemSupportType => is_system_support_type(nodes, table_list, settings),
        RuleId::IsReadableSqlType => is_readable_sql_type(nodes, table_list, settings),
        RuleId::IsWritableSqlType => is_writable_sql_type(nodes, table_list, settings),
    }
}

/// Message reported by `rule` under `settings` when no override is configured
pub fn default_message(rule: RuleId, settings: &RuleSettings) -> String {
    match rule {
        RuleId::NotOrderBy => "Your query have ORDER BY clause.".to_string(),
        RuleId::NotGroupBy => "Your query have GROUP BY clause.".to_string(),
        RuleId::NotHaving => "Your query have HAVING clause.".to_string(),
        RuleId::LimitForAllSelectQuery => "Your query should have LIMIT clause.".to_string(),
        RuleId::LimitNumForAllSelectQuery => format!(
            "Your select query should have a LIMIT no more than {}.",
            settings.limit_cap
        ),
        RuleId::HasWhereForTypesInNeed => "Your query should have WHERE clause.".to_string(),
        RuleId::NotForbiddenFunc => format!(
            "Your query should not contain {}.",
            settings.forbidden_functions.join(", ")
        ),
        RuleId::IsSystemSupportType => "This SQL query type is not yet supported.".to_string(),
        RuleId::IsReadableSqlType => "This is not a readonly SQL query type.".to_string(),
        RuleId::IsWritableSqlType => "This is not a writable SQL query type.".to_string(),
    }
}

fn selects(nodes: &[Node]) -> impl Iterator<Item = &SelectNode> {
    nodes.iter().filter_map(Node::as_select)
}

pub fn not_order_by(nodes: &[Node]) -> RuleOutcome {
    RuleOutcome::new(
        !selects(nodes).any(|select| select.has_order_by()),
        "Your query have ORDER BY clause.",
    )
}

pub fn not_group_by(nodes: &[Node]) -> RuleOutcome {
    RuleOutcome::new(
        !selects(nodes).any(|select| select.has_group_by()),
        "Your query have GROUP BY clause.",
    )
}

pub fn not_having(nodes: &[Node]) -> RuleOutcome {
    RuleOutcome::new(
        !selects(nodes).any(|select| select.having.is_some()),
        "Your query have HAVING clause.",
    )
}

pub fn limit_for_all_select_query(nodes: &[Node]) -> RuleOutcome {
    RuleOutcome::new(
        selects(nodes).all(|select| select.limit.is_some()),
        "Your query should have LIMIT clause.",
    )
}

/// A missing LIMIT fails, and so does a count that is not a plain integer
pub fn limit_num_for_all_select_query(nodes: &[Node], settings: &RuleSettings) -> RuleOutcome {
    let passed = selects(nodes).all(|select| {
        select
            .limit
            .as_ref()
            .and_then(|limit| limit.count_value())
            .is_some_and(|count| count <= settings.limit_cap)
    });

    RuleOutcome::new(
        passed,
        default_message(RuleId::LimitNumForAllSelectQuery, settings),
    )
}

pub fn has_where_for_types_in_need(nodes: &[Node], settings: &RuleSettings) -> RuleOutcome {
    let passed = nodes.iter().all(|node| {
        !contains(&settings.need_where_types, node.type_tag()) || node.where_clause().is_some()
    });

    RuleOutcome::new(passed, "Your query should have WHERE clause.")
}

/// Only selected columns are inspected, not WHERE or ORDER BY expressions
pub fn not_forbidden_func(nodes: &[Node], settings: &RuleSettings) -> RuleOutcome {
    let passed = !nodes.iter().flat_map(Node::columns).any(|column| {
        column.expr.function_name().is_some_and(|name| {
            settings
                .forbidden_functions
                .iter()
                .any(|forbidden| forbidden.eq_ignore_ascii_case(name))
        })
    });

    RuleOutcome::new(passed, default_message(RuleId::NotForbiddenFunc, settings))
}

pub fn is_system_support_type(
    nodes: &[Node],
    table_list: &[String],
    settings: &RuleSettings,
) -> RuleOutcome {
    RuleOutcome::new(
        types_allowed(nodes, table_list, &settings.supported_types),
        "This SQL query type is not yet supported.",
    )
}

pub fn is_readable_sql_type(
    nodes: &[Node],
    table_list: &[String],
    settings: &RuleSettings,
) -> RuleOutcome {
    RuleOutcome::new(
        types_allowed(nodes, table_list, &settings.readable_types),
        "This is not a readonly SQL query type.",
    )
}

pub fn is_writable_sql_type(
    nodes: &[Node],
    table_list: &[String],
    settings: &RuleSettings,
) -> RuleOutcome {
    RuleOutcome::new(
        types_allowed(nodes, table_list, &settings.writable_types),
        "This is not a writable SQL query type.",
    )
}

/// Both the node types and the table-list type tags must be allowed
fn types_allowed(nodes: &[Node], table_list: &[String], allowed: &[String]) -> bool {
    let tables_allowed = table_list
        .iter()
        .map(|entry| table_type_tag(entry))
        .all(|tag| contains(allowed, &tag));

    let nodes_allowed = nodes.iter().all(|node| contains(allowed, node.type_tag()));

    tables_allowed && nodes_allowed
}

/// `select::db::table` -> `select`
fn table_type_tag(entry: &str) -> String {
    entry
        .split("::")
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn contains(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| t == tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlgate_sql::{normalize, SqlParser, TypeFilter};

    /// Extracted nodes and full table list of the first statement
    fn statement(sql: &str) -> (Vec<Node>, Vec<String>) {
        let result = normalize(&SqlParser::new(), sql, &TypeFilter::default()).unwrap();
        let first = result.first_statement().unwrap();
        (first.extracted.clone(), result.full_table_list.clone())
    }

    fn passes(rule: RuleId, sql: &str) -> bool {
        let (nodes, tables) = statement(sql);
        check(rule, &nodes, &tables, &RuleSettings::default()).passed
    }

    #[test]
    fn forbidden_function() {
        let (nodes, tables) =
            statement("SELECT BENCHMARK(1000000,ENCODE('hello','goodbye')) LIMIT 1;");
        let outcome = check(RuleId::NotForbiddenFunc, &nodes, &tables, &RuleSettings::default());

        assert_eq!(
            outcome,
            RuleOutcome::new(false, "Your query should not contain BENCHMARK.")
        );
    }

    #[test]
    fn forbidden_function_ignores_case() {
        assert!(!passes(RuleId::NotForbiddenFunc, "SELECT benchmark(10, 1) LIMIT 1"));
        assert!(passes(RuleId::NotForbiddenFunc, "SELECT COUNT(*) FROM t LIMIT 1"));
    }

    #[test]
    fn order_group_having() {
        assert!(!passes(RuleId::NotOrderBy, "SELECT * FROM app_tab ORDER BY name"));
        assert!(passes(RuleId::NotOrderBy, "SELECT * FROM app_tab"));

        assert!(!passes(RuleId::NotGroupBy, "SELECT * FROM app_tab Group By name"));
        assert!(passes(RuleId::NotGroupBy, "SELECT * FROM app_tab"));

        assert!(!passes(
            RuleId::NotHaving,
            "SELECT * FROM app_tab Group By name Having name is not null"
        ));
        assert!(passes(RuleId::NotHaving, "SELECT * FROM app_tab"));
    }

    #[test]
    fn nested_select_order_by() {
        assert!(!passes(
            RuleId::NotOrderBy,
            "SELECT * FROM (SELECT * FROM t ORDER BY id LIMIT 5) AS x LIMIT 5"
        ));
    }

    #[test]
    fn limit_presence() {
        assert!(!passes(RuleId::LimitForAllSelectQuery, "SELECT * FROM app_tab"));
        assert!(passes(RuleId::LimitForAllSelectQuery, "SELECT * FROM app_tab LIMIT 10"));
        assert!(!passes(
            RuleId::LimitForAllSelectQuery,
            "SELECT * FROM (SELECT * FROM t) AS x LIMIT 10"
        ));
        // non-select statements pass vacuously
        assert!(passes(RuleId::LimitForAllSelectQuery, "DELETE FROM t WHERE id = 1"));
    }

    #[test]
    fn limit_cap() {
        let cases = [
            ("SELECT * FROM app_tab", false),
            ("SELECT * FROM app_tab LIMIT 10", true),
            ("SELECT * FROM app_tab LIMIT 100", true),
            ("SELECT * FROM app_tab LIMIT 1000", false),
            ("SELECT * FROM app_tab LIMIT 500, 20", true),
            ("SELECT * FROM app_tab LIMIT 5, 200", false),
        ];

        for (sql, expected) in cases {
            assert_eq!(passes(RuleId::LimitNumForAllSelectQuery, sql), expected, "{sql}");
        }
    }

    #[test]
    fn limit_cap_is_configurable() {
        let (nodes, tables) = statement("SELECT * FROM app_tab LIMIT 50");
        let settings = RuleSettings {
            limit_cap: 20,
            ..RuleSettings::default()
        };

        let outcome = check(RuleId::LimitNumForAllSelectQuery, &nodes, &tables, &settings);
        assert!(!outcome.passed);
        assert_eq!(
            outcome.message,
            "Your select query should have a LIMIT no more than 20."
        );
    }

    #[test]
    fn where_for_update_and_delete() {
        let cases = [
            ("SELECT * FROM app_tab", true),
            ("SELECT * FROM app_tab WHERE id > 10", true),
            ("UPDATE log SET k1=1", false),
            ("UPDATE log SET k1=1 WHERE id = 1", true),
            ("DELETE FROM app_tab", false),
            ("DELETE FROM app_tab WHERE id = 1", true),
            ("INSERT INTO app (name) VALUES ('a')", true),
            ("USE db_portal_q2_dev", true),
        ];

        for (sql, expected) in cases {
            assert_eq!(passes(RuleId::HasWhereForTypesInNeed, sql), expected, "{sql}");
        }
    }

    #[test]
    fn type_membership() {
        let insert_pair = "insert into app (name, description) values ('test i2', 'test i2'); \
                           insert into app (name, description) values ('test i', 'test i');";
        // (sql, supported, readable, writable)
        let cases = [
            ("SELECT * FROM app_tab", true, true, true),
            ("UPDATE log SET k1=1", true, false, true),
            ("DELETE FROM app_tab", true, false, true),
            (insert_pair, true, false, true),
            ("USE db_portal_q2_dev", true, true, true),
            ("DROP TABLE app_tab", false, false, false),
            ("DESC app_tab", true, true, true),
            ("SHOW CREATE TABLE app_tab", true, true, true),
            ("LOCK TABLES app_tab WRITE", false, false, false),
            ("CALL purge_all()", false, false, false),
        ];

        for (sql, supported, readable, writable) in cases {
            assert_eq!(passes(RuleId::IsSystemSupportType, sql), supported, "{sql}");
            assert_eq!(passes(RuleId::IsReadableSqlType, sql), readable, "{sql}");
            assert_eq!(passes(RuleId::IsWritableSqlType, sql), writable, "{sql}");
        }
    }

    #[test]
    fn table_list_alone_can_fail_membership() {
        let tables = vec!["drop::null::app_tab".to_string()];
        let outcome = is_writable_sql_type(&[], &tables, &RuleSettings::default());

        assert!(!outcome.passed);
    }

    #[test]
    fn table_tag_is_case_insensitive() {
        let tables = vec!["SELECT::null::app_tab".to_string()];
        assert!(is_readable_sql_type(&[], &tables, &RuleSettings::default()).passed);
    }

    #[test]
    fn empty_input_passes_everything() {
        let settings = RuleSettings::default();
        for rule in RuleId::ALL {
            assert!(check(rule, &[], &[], &settings).passed, "{rule}");
        }
    }

    #[test]
    fn select_is_never_both_unreadable_and_unwritable() {
        for sql in [
            "SELECT * FROM app_tab LIMIT 1",
            "SELECT a.id FROM db.a a JOIN b ON a.id = b.id",
            "SELECT id FROM t WHERE id IN (SELECT id FROM u)",
        ] {
            assert!(
                passes(RuleId::IsReadableSqlType, sql) || passes(RuleId::IsWritableSqlType, sql),
                "{sql}"
            );
        }
    }

    #[test]
    fn outcome_messages_match_defaults() {
        let settings = RuleSettings::default();
        let (nodes, tables) = statement("DROP TABLE app_tab");

        for rule in RuleId::ALL {
            let outcome = check(rule, &nodes, &tables, &settings);
            assert_eq!(outcome.message, default_message(rule, &settings), "{rule}");
        }
    }
}
