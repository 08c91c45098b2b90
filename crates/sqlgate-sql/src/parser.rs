//! SQL parsing using datafusion-sqlparser-rs
//!
//! Parses SQL into statement nodes and collects the table and column
//! references of each statement.

use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect};
use sqlparser::parser::{Parser, ParserError};
use sqlgate_core::{DialectConfig, Node};
use crate::lower::Lowerer;

/// SQL parser with configurable dialect
#[derive(Debug)]
pub struct SqlParser {
    dialect: Box<dyn Dialect + Send + Sync>,
}

impl SqlParser {
    /// Create a new SQL parser with the default (MySQL) dialect
    pub fn new() -> Self {
        Self::mysql()
    }

    /// Create a SQL parser for MySQL
    pub fn mysql() -> Self {
        Self {
            dialect: Box::new(MySqlDialect {}),
        }
    }

    /// Create a SQL parser for generic ANSI SQL
    pub fn generic() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: &DialectConfig) -> Self {
        match dialect {
            DialectConfig::MySql => Self::mysql(),
            DialectConfig::Generic => Self::generic(),
        }
    }

    /// Parse SQL string into statement nodes
    pub fn parse(&self, sql: &str) -> Result<ParsedSql, ParseError> {
        let statements = Parser::parse_sql(&*self.dialect, sql)
            .map_err(|error| ParseError { error })?;

        tracing::trace!(count = statements.len(), "parsed sql statements");

        let statements = statements
            .iter()
            .map(|statement| {
                let mut lowerer = Lowerer::default();
                let node = lowerer.lower_statement(statement);
                let (table_list, column_list) = lowerer.finish();

                ParsedStatement {
                    node,
                    sql: statement.to_string(),
                    table_list,
                    column_list,
                }
            })
            .collect();

        Ok(ParsedSql { statements })
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// One statement as produced by the parser
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub node: Node,

    /// Canonical SQL rendered from the parsed statement
    pub sql: String,

    /// `type::schema::table` references, in document order
    pub table_list: Vec<String>,

    /// `type::table::column` references, in document order
    pub column_list: Vec<String>,
}

/// Successfully parsed SQL
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSql {
    pub statements: Vec<ParsedStatement>,
}

impl ParsedSql {
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn first_statement(&self) -> Option<&ParsedStatement> {
        self.statements.first()
    }

    /// Table references of every statement, de-duplicated
    pub fn table_list(&self) -> Vec<String> {
        merge(self.statements.iter().map(|s| &s.table_list))
    }

    /// Column references of every statement, de-duplicated
    pub fn column_list(&self) -> Vec<String> {
        merge(self.statements.iter().map(|s| &s.column_list))
    }
}

fn merge<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for entry in lists.flatten() {
        if !merged.contains(entry) {
            merged.push(entry.clone());
        }
    }
    merged
}

/// SQL parsing error; displays the parser's own text
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ParseError {
    /// Parser error from sqlparser
    pub error: ParserError,
}
