//! Command-line argument definitions.

use clap::{Parser, ValueEnum};
use sqlcheck_core::Severity;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sqlcheck",
    version,
    about = "T-SQL static analysis and auto-remediation",
    after_help = "Exit codes: 0 clean, 1 violations found, 66 usage or I/O error."
)]
pub struct Args {
    /// SQL files to check; reads stdin when empty or given "-".
    pub files: Vec<PathBuf>,

    /// Apply fixes in place (stdin input is written to stdout).
    #[arg(long)]
    pub fix: bool,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Compatibility level gating version-dependent rules.
    #[arg(long, default_value_t = 150)]
    pub compat_level: u16,

    /// Drop diagnostics below this severity.
    #[arg(long, value_enum)]
    pub min_severity: Option<SeverityArg>,

    /// Rule ids to disable (repeatable).
    #[arg(long = "disable", value_name = "RULE_ID")]
    pub disable: Vec<String>,

    /// List the available rules and exit.
    #[arg(long)]
    pub list_rules: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}
