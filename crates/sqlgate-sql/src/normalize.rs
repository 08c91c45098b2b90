//! Statement normalization
//!
//! Turns one parser call over the whole input into a [`SqlParseResult`]
//! with the same shape whether the input held one statement or many.

use sqlgate_core::{FullAst, SqlParseResult, Statement};

use crate::extract::{extract, TypeFilter};
use crate::parser::{ParseError, ParsedSql, SqlParser};

/// Parse `sql` and normalize the result
pub fn normalize(
    parser: &SqlParser,
    sql: &str,
    filter: &TypeFilter,
) -> Result<SqlParseResult, ParseError> {
    let parsed = parser.parse(sql)?;
    Ok(normalize_parsed(parsed, filter))
}

/// Normalize an already parsed input
///
/// A single statement reuses the full table and column lists. With several
/// statements each one keeps only the references found in its own text.
pub fn normalize_parsed(parsed: ParsedSql, filter: &TypeFilter) -> SqlParseResult {
    let full_table_list = parsed.table_list();
    let full_column_list = parsed.column_list();
    let single = parsed.statement_count() == 1;

    let statements: Vec<Statement> = parsed
        .statements
        .into_iter()
        .map(|statement| {
            let extracted = extract(&statement.node, filter)
                .into_iter()
                .cloned()
                .collect();
            let (table_list, column_list) = if single {
                (full_table_list.clone(), full_column_list.clone())
            } else {
                (statement.table_list, statement.column_list)
            };

            Statement {
                ast: statement.node,
                sql: statement.sql,
                table_list,
                column_list,
                extracted,
            }
        })
        .collect();

    let full_ast = match statements.as_slice() {
        [only] => FullAst::Single(only.ast.clone()),
        many => FullAst::Multiple(many.iter().map(|s| s.ast.clone()).collect()),
    };

    tracing::trace!(
        statements = statements.len(),
        tables = full_table_list.len(),
        "normalized parse result"
    );

    SqlParseResult {
        full_ast,
        full_table_list,
        full_column_list,
        statements,
    }
}
