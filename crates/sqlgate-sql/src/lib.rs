//! SQL parsing and statement extraction
//!
//! This crate handles:
//! - Parsing SQL using datafusion-sqlparser-rs
//! - Lowering parsed statements into statement nodes
//! - Collecting table and column references per statement
//! - Extracting statement-level nodes from nested trees
//! - Normalizing single and multi-statement input into one shape

pub mod parser;
pub mod extract;
pub mod normalize;
mod lower;

pub use parser::{SqlParser, ParsedSql, ParsedStatement, ParseError};
pub use extract::{extract, extract_all, extract_with_limit, ExtractError, TypeFilter};
pub use normalize::{normalize, normalize_parsed};
