//! Configuration schema (sqlgate.toml)

use serde::{Deserialize, Serialize};
use crate::ast::node_type;
use crate::policy::{Policy, PolicyPreset, RuleConfig};

/// SQL dialect handed to the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// MySQL dialect (`LIMIT offset, count`, `REPLACE INTO`, backtick quoting)
    #[default]
    MySql,

    /// Generic ANSI SQL
    Generic,
}

/// Policy as written in the config file: a preset name or an explicit rule list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyConfig {
    Preset(PolicyPreset),
    Rules(Vec<RuleConfig>),
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::Preset(PolicyPreset::default())
    }
}

impl PolicyConfig {
    pub fn to_policy(&self) -> Policy {
        match self {
            Self::Preset(preset) => Policy::preset(*preset),
            Self::Rules(rules) => Policy::new(rules.clone()),
        }
    }
}

/// Tunable constants used by the built-in rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    /// Largest LIMIT count accepted by `limitNumForAllSelectQuery`
    pub limit_cap: u64,

    /// Statement kinds that must carry WHERE
    pub need_where_types: Vec<String>,

    /// Functions that may not appear as selected columns (case-insensitive)
    pub forbidden_functions: Vec<String>,

    /// Statement kinds supported by the system
    pub supported_types: Vec<String>,

    /// Statement kinds allowed for read-only access
    pub readable_types: Vec<String>,

    /// Statement kinds allowed for write access
    pub writable_types: Vec<String>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        let owned = |tags: &[&str]| tags.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        let all_dml = [
            node_type::USE,
            node_type::SELECT,
            node_type::REPLACE,
            node_type::INSERT,
            node_type::UPDATE,
            node_type::DELETE,
        ];

        Self {
            limit_cap: 100,
            need_where_types: owned(&[node_type::UPDATE, node_type::DELETE]),
            forbidden_functions: owned(&["BENCHMARK"]),
            supported_types: owned(&all_dml),
            readable_types: owned(&[node_type::USE, node_type::SELECT]),
            writable_types: owned(&all_dml),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Largest number of statements accepted in one input
    #[serde(default = "default_max_sql_num")]
    pub max_sql_num: usize,

    /// Rules to run, in report order
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Rule constants
    #[serde(default)]
    pub rules: RuleSettings,
}

fn default_max_sql_num() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            max_sql_num: default_max_sql_num(),
            policy: PolicyConfig::default(),
            rules: RuleSettings::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    pub fn policy(&self) -> Policy {
        self.policy.to_policy()
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
