//! SQLGate engine - rule evaluation and classification
//!
//! This crate implements:
//! - The built-in structural rules
//! - Policy evaluation with per-rule severity
//! - Classification of an input text into one validation result

pub mod rules;
pub mod evaluator;
pub mod validator;

pub use rules::{check, default_message, RuleOutcome};
pub use evaluator::evaluate;
pub use validator::{validate, Validator};
