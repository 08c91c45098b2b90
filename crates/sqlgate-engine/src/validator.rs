//! Validation entry point
//!
//! Classifies one input text as empty, a syntax error, too many statements,
//! a rule violation, or valid. Every failure is reported as a classification;
//! validation itself never returns an error.

use sqlgate_core::{
    Config, Policy, PolicyPreset, RuleSettings, Severity, SqlParseResult, UiMessages, ValidateResult,
    ValidateSqlResult,
};
use sqlgate_sql::{normalize, SqlParser, TypeFilter};

use crate::evaluator::evaluate;

/// Validates SQL text against a policy
///
/// Holds only immutable configuration, so one validator can be shared
/// across threads.
#[derive(Debug)]
pub struct Validator {
    parser: SqlParser,
    policy: Policy,
    settings: RuleSettings,
    max_sql_num: usize,
    filter: TypeFilter,
}

impl Validator {
    /// Validator with the MySQL dialect, default rule settings, and one statement per input
    pub fn new(policy: Policy) -> Self {
        Self {
            parser: SqlParser::new(),
            policy,
            settings: RuleSettings::default(),
            max_sql_num: 1,
            filter: TypeFilter::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.policy())
            .with_parser(SqlParser::from_dialect(&config.dialect))
            .with_settings(config.rules.clone())
            .with_max_sql_num(config.max_sql_num)
    }

    pub fn with_parser(mut self, parser: SqlParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_settings(mut self, settings: RuleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_max_sql_num(mut self, max_sql_num: usize) -> Self {
        self.max_sql_num = max_sql_num;
        self
    }

    pub fn with_filter(mut self, filter: TypeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    pub fn max_sql_num(&self) -> usize {
        self.max_sql_num
    }

    /// Validate one input text
    pub fn validate(&self, sql: &str) -> ValidateSqlResult {
        if sql.trim().is_empty() {
            tracing::debug!("empty sql");
            return ValidateSqlResult::empty_sql();
        }

        let parse_result = match normalize(&self.parser, sql, &self.filter) {
            Ok(parse_result) => parse_result,
            Err(error) => {
                tracing::debug!(%error, "sql syntax error");
                return ValidateSqlResult::syntax_error(error.to_string());
            }
        };

        // Only separators or comments
        if parse_result.statements.is_empty() {
            tracing::debug!("sql has no statements");
            return ValidateSqlResult::empty_sql();
        }

        if parse_result.statement_count() > self.max_sql_num {
            tracing::debug!(
                count = parse_result.statement_count(),
                max = self.max_sql_num,
                "too many sql statements"
            );
            return ValidateSqlResult::multi_sql(parse_result, self.max_sql_num);
        }

        let results = self.evaluate_first(&parse_result);
        if results.is_empty() {
            return ValidateSqlResult::success(parse_result);
        }

        tracing::debug!(failures = results.len(), "sql failed validation");
        let ui_messages = ui_messages(&results);
        ValidateSqlResult::validate_error(parse_result, results, ui_messages)
    }

    /// Rules run over the first statement's extracted nodes and the full table list
    fn evaluate_first(&self, parse_result: &SqlParseResult) -> Vec<ValidateResult> {
        match parse_result.first_statement() {
            Some(first) => evaluate(
                &self.policy,
                &first.extracted,
                &parse_result.full_table_list,
                &self.settings,
            ),
            None => Vec::new(),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Policy::preset(PolicyPreset::default()))
    }
}

/// Validate `sql` against `policy` with default rule settings
pub fn validate(sql: &str, policy: &Policy, max_sql_num: usize) -> ValidateSqlResult {
    Validator::new(policy.clone())
        .with_max_sql_num(max_sql_num)
        .validate(sql)
}

/// Error messages when any rule failed at `error`, otherwise the warnings
fn ui_messages(results: &[ValidateResult]) -> UiMessages {
    let messages_at = |level: Severity| -> Vec<String> {
        results
            .iter()
            .filter(|result| result.level == level)
            .map(|result| result.message.clone())
            .collect()
    };

    let errors = messages_at(Severity::Error);
    if !errors.is_empty() {
        return UiMessages::List(errors);
    }

    let warnings = messages_at(Severity::Warn);
    if !warnings.is_empty() {
        return UiMessages::List(warnings);
    }

    sqlgate_core::report::INVALID_QUERY_MESSAGE.into()
}
