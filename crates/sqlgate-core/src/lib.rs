//! SQLGate Core
//!
//! Core domain model shared by the parser adapter and the rule engine.
//! Rule names and report field names are part of the public API.

pub mod ast;
pub mod policy;
pub mod report;
pub mod config;

pub use ast::{
    node_type, Assignment, DeleteNode, ExprKind, Expression, InsertNode, LimitClause, Node,
    OtherNode, Relation, SelectColumn, SelectNode, UpdateNode, UseNode,
};
pub use policy::{Policy, PolicyPreset, RuleConfig, RuleId, Severity};
pub use report::{
    FullAst, SqlErrorType, SqlParseResult, Statement, UiMessages, ValidateResult,
    ValidateSqlResult,
};
pub use config::{Config, ConfigError, DialectConfig, PolicyConfig, RuleSettings};
