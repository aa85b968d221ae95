//! Report formatting for the terminal and for machine consumers.

use anyhow::Result;
use owo_colors::OwoColorize;
use sqlcheck_core::{FileReport, Severity};
use std::fmt::Write;
use tabled::{Table, Tabled};

/// Formats one file's report as human-readable lines. Positions are shown
/// 1-based, the way editors display them.
pub fn format_text(report: &FileReport, color: bool) -> String {
    let mut out = String::new();

    for diagnostic in &report.diagnostics {
        let severity = diagnostic.severity.unwrap_or(Severity::Warning);
        let severity_label = if color {
            match severity {
                Severity::Error => severity.to_string().red().bold().to_string(),
                Severity::Warning => severity.to_string().yellow().to_string(),
                Severity::Info => severity.to_string().cyan().to_string(),
            }
        } else {
            severity.to_string()
        };
        let _ = writeln!(
            out,
            "{}:{}:{}: {} [{}] {}",
            report.file_path,
            diagnostic.range.start.line + 1,
            diagnostic.range.start.character + 1,
            severity_label,
            diagnostic.code,
            diagnostic.message
        );
    }

    for failure in &report.failures {
        let _ = writeln!(
            out,
            "{}: rule '{}' failed and was skipped: {}",
            report.file_path, failure.rule_id, failure.message
        );
    }

    if report.is_clean() {
        let _ = writeln!(out, "{}: no issues found", report.file_path);
    }
    out
}

/// Serializes all reports as pretty JSON (the aggregate report shape).
pub fn format_json(reports: &[FileReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

#[derive(Tabled)]
pub struct RuleRow {
    pub rule: String,
    pub category: String,
    pub severity: String,
    pub fixable: bool,
    pub description: String,
}

/// Renders the rule catalog listing for `--list-rules`.
pub fn format_rule_table(rows: Vec<RuleRow>) -> String {
    Table::new(rows).to_string()
}
