use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sqlgate_core::{Config, PolicyConfig, PolicyPreset, RuleId, Severity, ValidateSqlResult};
use sqlgate_engine::{default_message, Validator};

const DEFAULT_CONFIG_FILE: &str = "sqlgate.toml";

/// SQLGate - policy checks for SQL statements
#[derive(Parser)]
#[command(name = "sqlgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: sqlgate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate SQL against a policy
    Check {
        /// SQL text (read from --file or stdin when omitted)
        sql: Option<String>,

        /// Read SQL from a file
        #[arg(short, long, conflicts_with = "sql")]
        file: Option<PathBuf>,

        /// Built-in policy to apply: common, read or write
        #[arg(short, long)]
        policy: Option<PolicyPreset>,

        /// Largest number of statements accepted
        #[arg(short, long)]
        max_sql_num: Option<usize>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the rules of the active policy
    Rules,

    /// Write a default config file
    InitConfig {
        /// Where to write the config
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Check {
            sql,
            file,
            policy,
            max_sql_num,
            json,
        } => {
            let mut config = config;
            if let Some(preset) = policy {
                config.policy = PolicyConfig::Preset(preset);
            }
            if let Some(max_sql_num) = max_sql_num {
                config.max_sql_num = max_sql_num;
            }

            let sql = read_sql(sql, file.as_deref())?;
            check_command(&config, &sql, json, cli.verbose)
        }
        Commands::Rules => {
            rules_command(&config);
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitConfig { output, force } => {
            init_config_command(&output, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr; RUST_LOG wins over --verbose
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);

    let config = if let Some(path) = path {
        Config::from_file(path).with_context(|| format!("failed to load {}", path.display()))?
    } else if default_path.exists() {
        Config::from_file(default_path)?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if verbose {
        eprintln!(
            "{} dialect: {:?}, max statements: {}",
            "Using".cyan(),
            config.dialect,
            config.max_sql_num
        );
    }

    Ok(config)
}

fn read_sql(sql: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(sql) = sql {
        return Ok(sql);
    }

    if let Some(file) = file {
        return std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()));
    }

    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("failed to read SQL from stdin")?;
    Ok(sql)
}

/// Check command - validate one input, exit non-zero unless it is valid
fn check_command(config: &Config, sql: &str, json: bool, verbose: bool) -> Result<ExitCode> {
    let validator = Validator::from_config(config);
    tracing::debug!(bytes = sql.len(), rules = validator.policy().len(), "validating sql");
    let result = validator.validate(sql);

    if json {
        println!("{}", result.to_json()?);
    } else {
        print_result(&result, verbose);
    }

    Ok(if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(result: &ValidateSqlResult, verbose: bool) {
    if result.is_valid() {
        println!("{}", format!("✓ {}", result.ui_messages).green().bold());
    } else {
        println!(
            "{} {}",
            "✗".red().bold(),
            result.sql_error_type.to_string().red().bold()
        );
        for message in result.ui_messages.to_vec() {
            println!("  {}", message);
        }
    }

    if verbose && !result.validate_results.is_empty() {
        println!();
        println!("{}", "Failed rules:".bold());
        for failed in &result.validate_results {
            println!(
                "  [{}] {}: {}",
                level_label(failed.level),
                failed.validator_name,
                failed.message
            );
        }
    }

    if verbose {
        if let Some(parse) = &result.sql_parse_result {
            println!();
            println!("{} {}", "Statements:".bold(), parse.statement_count());
            for table in &parse.full_table_list {
                println!("  {} {}", "table".cyan(), table);
            }
        }
    }
}

fn level_label(level: Severity) -> colored::ColoredString {
    match level {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Pass => "PASS".green(),
    }
}

/// Rules command - show the active policy, then the remaining built-in rules
fn rules_command(config: &Config) {
    let policy = config.policy();

    println!("{}", "Active policy:".bold());
    for rule in policy.rules() {
        let message = rule
            .message
            .clone()
            .unwrap_or_else(|| default_message(rule.rule, &config.rules));
        println!(
            "  [{}] {}: {}",
            level_label(rule.effective_level()),
            rule.rule,
            message
        );
    }

    let inactive: Vec<RuleId> = RuleId::ALL
        .into_iter()
        .filter(|id| !policy.rules().iter().any(|rule| rule.rule == *id))
        .collect();

    if !inactive.is_empty() {
        println!();
        println!("{}", "Not in policy:".bold());
        for id in inactive {
            println!("  {}: {}", id, default_message(id, &config.rules));
        }
    }
}

/// Init-config command - write the default configuration
fn init_config_command(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    Config::default().save_to_file(output)?;
    eprintln!("{} {}", "Config written to:".green(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_flags() {
        let cli = Cli::try_parse_from([
            "sqlgate",
            "check",
            "SELECT 1",
            "--policy",
            "write",
            "--max-sql-num",
            "2",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Check {
                sql,
                policy,
                max_sql_num,
                json,
                ..
            } => {
                assert_eq!(sql.as_deref(), Some("SELECT 1"));
                assert_eq!(policy, Some(PolicyPreset::Write));
                assert_eq!(max_sql_num, Some(2));
                assert!(json);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["sqlgate", "check", "SELECT 1", "--policy", "admin"]).is_err());
    }
}
