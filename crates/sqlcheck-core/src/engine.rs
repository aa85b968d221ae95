//! Rule execution engine.
//!
//! Runs a resolved set of rules over one document, isolating per-rule
//! failures, resolving severities, and normalizing the diagnostic stream
//! into the aggregate report consumed by the reporting layer. Also drives
//! the bounded "fix everything" loop on top of the composer.

use crate::diagnostics::{Diagnostic, Fix, Severity};
use crate::fixer::{self, ComposeOutcome};
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleContext, RuleSettings};
use crate::source::SourceDocument;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Upper bound on batch-fix passes. Each pass re-runs analysis, so the loop
/// terminates even when a fix does not clear the violation it targeted.
pub const MAX_FIX_PASSES: usize = 10;

/// One rule selected for a run, with its resolved settings.
pub struct RuleSelection {
    pub rule: Arc<dyn Rule>,
    pub settings: RuleSettings,
}

/// Per-run options handed down by the (external) configuration layer.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Numeric dialect-version gate (e.g. 150 for SQL Server 2019 scripts).
    pub compat_level: u16,
    /// Diagnostics below this severity are dropped from the report.
    pub min_severity: Option<Severity>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            compat_level: 150,
            min_severity: None,
        }
    }
}

/// A rule that failed during analysis. Surfaced, not silently swallowed;
/// the remaining rules still run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleFailure {
    pub rule_id: String,
    pub message: String,
}

/// Aggregate per-file report consumed by the reporting layer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_path: String,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RuleFailure>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Some(Severity::Error))
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.failures.is_empty()
    }
}

/// Result of a batch fix run.
#[derive(Debug, Clone)]
pub struct FixAllOutcome {
    /// The final text after all passes.
    pub text: String,
    /// Number of analysis+compose passes executed.
    pub passes: usize,
    /// Total fixes applied across passes.
    pub applied: usize,
    /// Diagnostics whose fix was still dropped in the final pass.
    pub unresolved: Vec<Diagnostic>,
    /// True when the final text differs from the input.
    pub changed: bool,
}

/// Executes a resolved rule selection against documents.
pub struct Engine {
    selections: Vec<RuleSelection>,
    options: RunOptions,
}

impl Engine {
    pub fn new(selections: Vec<RuleSelection>, options: RunOptions) -> Self {
        Self {
            selections,
            options,
        }
    }

    /// Selects every rule in the registry with empty settings.
    pub fn from_registry(registry: &RuleRegistry, options: RunOptions) -> Self {
        let selections = registry
            .iter()
            .map(|rule| RuleSelection {
                rule: Arc::clone(rule),
                settings: RuleSettings::new(),
            })
            .collect();
        Self::new(selections, options)
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Parses `text` and analyzes it with every selected rule.
    pub fn analyze(&self, file_path: &str, text: &str) -> FileReport {
        let document = SourceDocument::parse(text);
        self.analyze_document(file_path, &document)
    }

    /// Analyzes an already-built document.
    pub fn analyze_document(&self, file_path: &str, document: &SourceDocument) -> FileReport {
        let mut diagnostics: Vec<Diagnostic> = document.parse_errors().to_vec();
        let mut failures = Vec::new();

        for selection in &self.selections {
            let ctx = RuleContext::new(
                file_path,
                self.options.compat_level,
                document,
                &selection.settings,
            );
            let metadata = selection.rule.metadata();
            match catch_unwind(AssertUnwindSafe(|| selection.rule.analyze(&ctx))) {
                Ok(found) => {
                    for diagnostic in found {
                        let severity = diagnostic
                            .severity
                            .unwrap_or(metadata.default_severity);
                        diagnostics.push(diagnostic.with_severity(severity));
                    }
                }
                Err(payload) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(rule_id = %metadata.rule_id, "rule panicked during analysis");
                    failures.push(RuleFailure {
                        rule_id: metadata.rule_id.clone(),
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        if let Some(min) = self.options.min_severity {
            diagnostics.retain(|diagnostic| {
                diagnostic.severity.is_some_and(|severity| severity >= min)
            });
        }
        normalize_diagnostics(&mut diagnostics);

        FileReport {
            file_path: file_path.to_string(),
            diagnostics,
            failures,
        }
    }

    /// Applies one composer pass: collects fixes for every fixable retained
    /// diagnostic (the first fix each rule offers, in diagnostic emission
    /// order) and merges them into a rewrite of `text`.
    pub fn fix_pass(&self, file_path: &str, text: &str) -> ComposeOutcome {
        let document = SourceDocument::parse(text);
        let report = self.analyze_document(file_path, &document);
        let chosen = self.collect_fixes(file_path, &document, &report);
        fixer::apply_fixes(text, &chosen)
    }

    /// Batch "fix everything": repeats analyze+compose passes until no
    /// fixable diagnostics remain, a pass produces no change (fixed point),
    /// or [`MAX_FIX_PASSES`] is reached.
    pub fn fix_all(&self, file_path: &str, text: &str) -> FixAllOutcome {
        let mut current = text.to_string();
        let mut passes = 0usize;
        let mut applied = 0usize;
        let mut unresolved = Vec::new();

        while passes < MAX_FIX_PASSES {
            passes += 1;
            let document = SourceDocument::parse(&current);
            let report = self.analyze_document(file_path, &document);
            let chosen = self.collect_fixes(file_path, &document, &report);
            if chosen.is_empty() {
                unresolved.clear();
                break;
            }

            let outcome = fixer::apply_fixes(&current, &chosen);
            applied += outcome.applied;
            unresolved = outcome.unresolved;
            if !outcome.changed {
                break;
            }
            #[cfg(feature = "tracing")]
            tracing::trace!(pass = passes, applied = outcome.applied, "fix pass applied");
            current = outcome.text;
        }

        FixAllOutcome {
            changed: current != text,
            text: current,
            passes,
            applied,
            unresolved,
        }
    }

    fn collect_fixes(
        &self,
        file_path: &str,
        document: &SourceDocument,
        report: &FileReport,
    ) -> Vec<(Diagnostic, Fix)> {
        let mut chosen = Vec::new();
        for diagnostic in &report.diagnostics {
            if !diagnostic.data.fixable {
                continue;
            }
            let Some(selection) = self
                .selections
                .iter()
                .find(|selection| selection.rule.metadata().rule_id == diagnostic.data.rule_id)
            else {
                continue;
            };
            let ctx = RuleContext::new(
                file_path,
                self.options.compat_level,
                document,
                &selection.settings,
            );
            // A panicking fix provider contributes nothing; its diagnostic
            // stays in the report as unfixed.
            let fixes = catch_unwind(AssertUnwindSafe(|| {
                selection.rule.fixes(&ctx, diagnostic)
            }))
            .unwrap_or_default();
            if let Some(fix) = fixes.into_iter().next() {
                chosen.push((diagnostic.clone(), fix));
            }
        }
        chosen
    }
}

/// Stable output order: by range, then code, then message; exact duplicates
/// collapse.
fn normalize_diagnostics(diagnostics: &mut Vec<Diagnostic>) {
    diagnostics.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(a.range.end.cmp(&b.range.end))
            .then_with(|| a.code.cmp(&b.code))
            .then_with(|| a.message.cmp(&b.message))
    });
    diagnostics.dedup_by(|a, b| a == b);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "rule panicked".to_string()
    }
}
