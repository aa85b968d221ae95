//! sqlcheck CLI - T-SQL static analysis and auto-fix.

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use sqlcheck_cli::cli::{Args, OutputFormat};
use sqlcheck_cli::input;
use sqlcheck_cli::output::{self, RuleRow};
use sqlcheck_core::{Engine, FileReport, RuleRegistry, RuleSelection, RuleSettings, RunOptions};
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

/// Lint violations found.
const EXIT_VIOLATIONS: u8 = 1;
/// Usage, configuration, or I/O error.
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::from(EXIT_VIOLATIONS),
        Ok(false) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("sqlcheck: error: {error:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// Returns true when violations were found.
fn run(args: Args) -> Result<bool> {
    let registry = RuleRegistry::builtin();

    if args.list_rules {
        let rows = registry
            .iter()
            .map(|rule| {
                let metadata = rule.metadata();
                RuleRow {
                    rule: metadata.rule_id.clone(),
                    category: metadata.category.to_string(),
                    severity: metadata.default_severity.to_string(),
                    fixable: metadata.fixable,
                    description: metadata.description.clone(),
                }
            })
            .collect();
        println!("{}", output::format_rule_table(rows));
        return Ok(false);
    }

    for rule_id in &args.disable {
        if registry.get(rule_id).is_none() {
            anyhow::bail!("unknown rule id '{rule_id}' in --disable");
        }
    }

    let selections: Vec<RuleSelection> = registry
        .iter()
        .filter(|rule| !args.disable.contains(&rule.metadata().rule_id))
        .map(|rule| RuleSelection {
            rule: Arc::clone(rule),
            settings: RuleSettings::new(),
        })
        .collect();
    let engine = Engine::new(
        selections,
        RunOptions {
            compat_level: args.compat_level,
            min_severity: args.min_severity.map(Into::into),
        },
    );

    let files = input::read_input(&args.files)?;
    let mut reports: Vec<FileReport> = Vec::with_capacity(files.len());

    for file in files {
        let content = if args.fix {
            let outcome = engine.fix_all(&file.name, &file.content);
            if file.from_stdin {
                io::stdout()
                    .write_all(outcome.text.as_bytes())
                    .context("failed to write fixed output")?;
                continue;
            }
            if outcome.changed {
                fs::write(&file.name, &outcome.text)
                    .with_context(|| format!("failed to write {}", file.name))?;
            }
            outcome.text
        } else {
            file.content
        };

        reports.push(engine.analyze(&file.name, &content));
    }

    let has_violations = reports
        .iter()
        .any(|report| !report.diagnostics.is_empty() || !report.failures.is_empty());

    match args.format {
        OutputFormat::Text => {
            let color = io::stdout().is_terminal();
            for report in &reports {
                print!("{}", output::format_text(report, color));
            }
        }
        OutputFormat::Json => {
            println!("{}", output::format_json(&reports)?);
        }
    }

    Ok(has_violations)
}
