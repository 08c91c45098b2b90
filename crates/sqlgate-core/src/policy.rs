//! Rule identifiers, severities and policies
//!
//! Rule names are reported to callers and stored in config files.
//! NEVER rename a rule - add new ones instead.

use serde::{Deserialize, Serialize};

/// Severity attached to a rule in a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Shown to the user only when no error-level rule failed
    #[default]
    Warn,

    /// Takes precedence over warnings in user-facing messages
    Error,

    /// Evaluated but never reported
    Pass,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
            Self::Pass => write!(f, "pass"),
        }
    }
}

/// Built-in rule registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleId {
    /// No SELECT carries ORDER BY
    NotOrderBy,

    /// No SELECT carries GROUP BY
    NotGroupBy,

    /// No SELECT carries HAVING
    NotHaving,

    /// Every SELECT carries LIMIT
    LimitForAllSelectQuery,

    /// Every SELECT's LIMIT count stays within the configured cap
    LimitNumForAllSelectQuery,

    /// Statement kinds that need WHERE carry one
    HasWhereForTypesInNeed,

    /// No selected column calls a forbidden function
    NotForbiddenFunc,

    /// Statement kinds are supported by the system
    IsSystemSupportType,

    /// Statement kinds are allowed for read-only access
    IsReadableSqlType,

    /// Statement kinds are allowed for write access
    IsWritableSqlType,
}

impl RuleId {
    pub const ALL: [RuleId; 10] = [
        Self::NotOrderBy,
        Self::NotGroupBy,
        Self::NotHaving,
        Self::LimitForAllSelectQuery,
        Self::LimitNumForAllSelectQuery,
        Self::HasWhereForTypesInNeed,
        Self::NotForbiddenFunc,
        Self::IsSystemSupportType,
        Self::IsReadableSqlType,
        Self::IsWritableSqlType,
    ];

    /// Stable name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotOrderBy => "notOrderBy",
            Self::NotGroupBy => "notGroupBy",
            Self::NotHaving => "notHaving",
            Self::LimitForAllSelectQuery => "limitForAllSelectQuery",
            Self::LimitNumForAllSelectQuery => "limitNumForAllSelectQuery",
            Self::HasWhereForTypesInNeed => "hasWhereForTypesInNeed",
            Self::NotForbiddenFunc => "notForbiddenFunc",
            Self::IsSystemSupportType => "isSystemSupportType",
            Self::IsReadableSqlType => "isReadableSqlType",
            Self::IsWritableSqlType => "isWritableSqlType",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.name() == name)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One entry of a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub rule: RuleId,

    /// Defaults to `warn`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Severity>,

    /// Replaces the rule's own message when it fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RuleConfig {
    pub const fn new(rule: RuleId) -> Self {
        Self {
            rule,
            level: None,
            message: None,
        }
    }

    pub const fn error(rule: RuleId) -> Self {
        Self {
            rule,
            level: Some(Severity::Error),
            message: None,
        }
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn effective_level(&self) -> Severity {
        self.level.unwrap_or_default()
    }
}

/// Rules shared by the read and write policies
pub const COMMON_RULES: &[RuleConfig] = &[
    RuleConfig::error(RuleId::IsSystemSupportType),
    RuleConfig::error(RuleId::HasWhereForTypesInNeed),
    RuleConfig::error(RuleId::LimitForAllSelectQuery),
    RuleConfig::error(RuleId::LimitNumForAllSelectQuery),
    RuleConfig::error(RuleId::NotForbiddenFunc),
    RuleConfig::new(RuleId::NotGroupBy),
    RuleConfig::new(RuleId::NotHaving),
    RuleConfig::new(RuleId::NotOrderBy),
];

pub const READ_RULES: &[RuleConfig] = &[RuleConfig::error(RuleId::IsReadableSqlType)];

pub const WRITE_RULES: &[RuleConfig] = &[RuleConfig::error(RuleId::IsWritableSqlType)];

/// Named built-in policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    Common,
    #[default]
    Read,
    Write,
}

impl std::str::FromStr for PolicyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "common" => Ok(Self::Common),
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            other => Err(format!("unknown policy '{}' (expected common, read or write)", other)),
        }
    }
}

/// Ordered list of rules with severities
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy {
    rules: Vec<RuleConfig>,
}

impl Policy {
    pub fn new(rules: Vec<RuleConfig>) -> Self {
        Self { rules }
    }

    pub fn common() -> Self {
        Self::new(COMMON_RULES.to_vec())
    }

    /// Common rules plus the read-only type check
    pub fn read() -> Self {
        Self::new([COMMON_RULES, READ_RULES].concat())
    }

    /// Common rules plus the writable type check
    pub fn write() -> Self {
        Self::new([COMMON_RULES, WRITE_RULES].concat())
    }

    pub fn preset(preset: PolicyPreset) -> Self {
        match preset {
            PolicyPreset::Common => Self::common(),
            PolicyPreset::Read => Self::read(),
            PolicyPreset::Write => Self::write(),
        }
    }

    pub fn with_rule(mut self, rule: RuleConfig) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RuleConfig] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<RuleConfig>> for Policy {
    fn from(rules: Vec<RuleConfig>) -> Self {
        Self::new(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rule_names_are_stable() {
        assert_eq!(RuleId::NotOrderBy.name(), "notOrderBy");
        assert_eq!(RuleId::LimitNumForAllSelectQuery.name(), "limitNumForAllSelectQuery");
        assert_eq!(RuleId::IsSystemSupportType.name(), "isSystemSupportType");

        // serde names agree with report names
        for rule in RuleId::ALL {
            let json = serde_json::to_string(&rule).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.name()));
            assert_eq!(RuleId::from_name(rule.name()), Some(rule));
        }
    }

    #[test]
    fn default_level_is_warn() {
        let config = RuleConfig::new(RuleId::NotOrderBy);
        assert_eq!(config.effective_level(), Severity::Warn);
        assert_eq!(config.with_level(Severity::Error).effective_level(), Severity::Error);
    }

    #[test]
    fn read_and_write_extend_common() {
        let read = Policy::read();
        let write = Policy::write();

        assert_eq!(read.len(), COMMON_RULES.len() + 1);
        assert_eq!(&read.rules()[..COMMON_RULES.len()], COMMON_RULES);
        assert_eq!(read.rules().last().map(|r| r.rule), Some(RuleId::IsReadableSqlType));
        assert_eq!(write.rules().last().map(|r| r.rule), Some(RuleId::IsWritableSqlType));
    }

    #[test]
    fn preset_parsing() {
        assert_eq!("READ".parse::<PolicyPreset>(), Ok(PolicyPreset::Read));
        assert!("admin".parse::<PolicyPreset>().is_err());
    }
}
