//! Policy evaluation
//!
//! Runs the rules of a policy, in order, against one statement and reports
//! each failure with its configured severity.

use sqlgate_core::{Node, Policy, RuleSettings, Severity, ValidateResult};

use crate::rules;

/// Evaluate `policy` against the extracted nodes and table list of one statement
///
/// Failures are returned in policy order, not grouped by severity. A rule
/// configured at `pass` is still run but never reported.
pub fn evaluate(
    policy: &Policy,
    nodes: &[Node],
    table_list: &[String],
    settings: &RuleSettings,
) -> Vec<ValidateResult> {
    let mut results = Vec::new();

    for config in policy.rules() {
        let outcome = rules::check(config.rule, nodes, table_list, settings);
        if outcome.passed {
            continue;
        }

        let level = config.effective_level();
        tracing::debug!(rule = %config.rule, %level, "rule failed");

        if level == Severity::Pass {
            continue;
        }

        let message = config.message.clone().unwrap_or(outcome.message);
        results.push(ValidateResult::failed(config.rule, level, message));
    }

    results
}
