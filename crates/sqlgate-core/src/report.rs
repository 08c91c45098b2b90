//! Validation result schema
//!
//! Field names are consumed by UI callers as JSON.
//! They are STABLE - add fields, never rename them.

use serde::{Deserialize, Serialize};
use crate::ast::Node;
use crate::policy::{RuleId, Severity};

pub const EMPTY_SQL_MESSAGE: &str = "Query cannot be empty.";
pub const SYNTAX_ERROR_HINT: &str = "Grammer error, please edit and retry.";
pub const INVALID_QUERY_MESSAGE: &str = "Invalid query.";
pub const SUCCESS_MESSAGE: &str = "success";

pub fn multi_sql_message(max_sql_num: usize) -> String {
    format!(
        "System only supports maxSqlNum query is {}, please edit your query and retry.",
        max_sql_num
    )
}

/// One top-level statement of the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub ast: Node,

    /// Canonical re-serialized SQL
    pub sql: String,

    pub table_list: Vec<String>,

    pub column_list: Vec<String>,

    /// Statement-level nodes reachable from `ast`, in pre-order
    #[serde(rename = "extractedAstList")]
    pub extracted: Vec<Node>,
}

/// The parser's AST for the whole input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FullAst {
    Single(Node),
    Multiple(Vec<Node>),
}

impl FullAst {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized parse output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlParseResult {
    pub full_ast: FullAst,

    pub full_table_list: Vec<String>,

    pub full_column_list: Vec<String>,

    #[serde(rename = "sqlDataList")]
    pub statements: Vec<Statement>,
}

impl SqlParseResult {
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn first_statement(&self) -> Option<&Statement> {
        self.statements.first()
    }
}

/// Classification of one validation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SqlErrorType {
    SyntaxError,
    MultiSql,
    ValidateError,
    NoError,
    EmptySql,
}

impl SqlErrorType {
    /// Numeric code, matching the order UI callers switch on
    pub fn code(&self) -> u8 {
        match self {
            Self::SyntaxError => 0,
            Self::MultiSql => 1,
            Self::ValidateError => 2,
            Self::NoError => 3,
            Self::EmptySql => 4,
        }
    }
}

impl std::fmt::Display for SqlErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SyntaxError => write!(f, "syntax error"),
            Self::MultiSql => write!(f, "too many statements"),
            Self::ValidateError => write!(f, "rule violation"),
            Self::NoError => write!(f, "valid"),
            Self::EmptySql => write!(f, "empty"),
        }
    }
}

/// A failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResult {
    pub validator_name: RuleId,

    pub level: Severity,

    /// Always false; passing rules are not reported
    pub result: bool,

    pub message: String,
}

impl ValidateResult {
    pub fn failed(rule: RuleId, level: Severity, message: impl Into<String>) -> Self {
        Self {
            validator_name: rule,
            level,
            result: false,
            message: message.into(),
        }
    }
}

/// Text shown to the user: one message or an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiMessages {
    Single(String),
    List(Vec<String>),
}

impl UiMessages {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(message) => vec![message.clone()],
            Self::List(messages) => messages.clone(),
        }
    }
}

impl From<&str> for UiMessages {
    fn from(message: &str) -> Self {
        Self::Single(message.to_string())
    }
}

impl std::fmt::Display for UiMessages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(message) => write!(f, "{}", message),
            Self::List(messages) => write!(f, "{}", messages.join("\n")),
        }
    }
}

/// Outcome of validating one input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSqlResult {
    pub message: String,

    pub ui_messages: UiMessages,

    pub sql_error_type: SqlErrorType,

    /// Failed rules in policy order; empty unless `sql_error_type` is `ValidateError`
    pub validate_results: Vec<ValidateResult>,

    pub sql_parse_result: Option<SqlParseResult>,
}

impl ValidateSqlResult {
    pub fn empty_sql() -> Self {
        Self {
            message: EMPTY_SQL_MESSAGE.to_string(),
            ui_messages: EMPTY_SQL_MESSAGE.into(),
            sql_error_type: SqlErrorType::EmptySql,
            validate_results: Vec::new(),
            sql_parse_result: None,
        }
    }

    /// `message` keeps the parser's text; the UI gets a fixed hint
    pub fn syntax_error(parser_message: impl Into<String>) -> Self {
        Self {
            message: parser_message.into(),
            ui_messages: SYNTAX_ERROR_HINT.into(),
            sql_error_type: SqlErrorType::SyntaxError,
            validate_results: Vec::new(),
            sql_parse_result: None,
        }
    }

    pub fn multi_sql(parse_result: SqlParseResult, max_sql_num: usize) -> Self {
        let message = multi_sql_message(max_sql_num);

        Self {
            ui_messages: UiMessages::Single(message.clone()),
            message,
            sql_error_type: SqlErrorType::MultiSql,
            validate_results: Vec::new(),
            sql_parse_result: Some(parse_result),
        }
    }

    pub fn validate_error(
        parse_result: SqlParseResult,
        validate_results: Vec<ValidateResult>,
        ui_messages: UiMessages,
    ) -> Self {
        Self {
            message: INVALID_QUERY_MESSAGE.to_string(),
            ui_messages,
            sql_error_type: SqlErrorType::ValidateError,
            validate_results,
            sql_parse_result: Some(parse_result),
        }
    }

    pub fn success(parse_result: SqlParseResult) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            ui_messages: SUCCESS_MESSAGE.into(),
            sql_error_type: SqlErrorType::NoError,
            validate_results: Vec::new(),
            sql_parse_result: Some(parse_result),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.sql_error_type == SqlErrorType::NoError
    }

    /// Failed rules at `error` level
    pub fn error_results(&self) -> Vec<&ValidateResult> {
        self.results_at(Severity::Error)
    }

    /// Failed rules at `warn` level
    pub fn warn_results(&self) -> Vec<&ValidateResult> {
        self.results_at(Severity::Warn)
    }

    fn results_at(&self, level: Severity) -> Vec<&ValidateResult> {
        self.validate_results
            .iter()
            .filter(|result| result.level == level)
            .collect()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_sql_result() {
        let result = ValidateSqlResult::empty_sql();
        assert_eq!(result.message, "Query cannot be empty.");
        assert_eq!(result.ui_messages, UiMessages::Single("Query cannot be empty.".to_string()));
        assert_eq!(result.sql_error_type, SqlErrorType::EmptySql);
        assert!(result.sql_parse_result.is_none());
        assert!(!result.is_valid());
    }

    #[test]
    fn syntax_error_keeps_parser_text() {
        let result = ValidateSqlResult::syntax_error("sql parser error: Expected: an expression");
        assert_eq!(result.message, "sql parser error: Expected: an expression");
        assert_eq!(result.ui_messages.to_string(), SYNTAX_ERROR_HINT);
    }

    #[test]
    fn multi_sql_message_names_the_limit() {
        assert_eq!(
            multi_sql_message(2),
            "System only supports maxSqlNum query is 2, please edit your query and retry."
        );
    }

    #[test]
    fn json_field_names() {
        let mut result = ValidateSqlResult::empty_sql();
        result.validate_results.push(ValidateResult::failed(
            RuleId::NotOrderBy,
            Severity::Warn,
            "Your query have ORDER BY clause.",
        ));

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["sqlErrorType"], "emptySql");
        assert_eq!(json["uiMessages"], "Query cannot be empty.");
        assert_eq!(json["sqlParseResult"], serde_json::Value::Null);
        assert_eq!(
            json["validateResults"][0],
            serde_json::json!({
                "validatorName": "notOrderBy",
                "level": "warn",
                "result": false,
                "message": "Your query have ORDER BY clause.",
            })
        );
    }

    #[test]
    fn ui_message_list_serializes_as_array() {
        let messages = UiMessages::List(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(serde_json::to_string(&messages).unwrap(), r#"["a","b"]"#);
        assert_eq!(messages.to_string(), "a\nb");
    }

    #[test]
    fn error_codes_follow_declaration_order() {
        assert_eq!(SqlErrorType::SyntaxError.code(), 0);
        assert_eq!(SqlErrorType::EmptySql.code(), 4);
    }
}
