//! Integration tests for fix collection, composition, and the batch
//! fix-everything loop.

use sqlcheck_core::{
    Diagnostic, Engine, Fix, Position, Range, RuleCategory, RuleContext, RuleMetadata,
    RuleRegistry, RuleSelection, RuleSettings, RunOptions, Severity, TextEdit, MAX_FIX_PASSES,
};
use std::sync::Arc;

fn engine() -> Engine {
    Engine::from_registry(&RuleRegistry::builtin(), RunOptions::default())
}

#[test]
fn fix_all_uppercases_keywords_and_terminates_statement() {
    let outcome = engine().fix_all("test.sql", "select a.x from a");
    assert_eq!(outcome.text, "SELECT a.x FROM a;");
    assert!(outcome.changed);
    assert_eq!(outcome.applied, 3);
    assert!(outcome.unresolved.is_empty());
    assert!(outcome.passes <= MAX_FIX_PASSES);
}

#[test]
fn fix_is_idempotent() {
    let engine = engine();
    let outcome = engine.fix_all("test.sql", "select a.x from a");
    let report = engine.analyze("test.sql", &outcome.text);
    assert!(report
        .diagnostics
        .iter()
        .all(|diagnostic| !diagnostic.data.fixable));

    let again = engine.fix_all("test.sql", &outcome.text);
    assert!(!again.changed);
    assert_eq!(again.text, outcome.text);
}

#[test]
fn fix_pass_equals_manual_descending_splice() {
    let sql = "select a.x from a;";
    let outcome = engine().fix_pass("test.sql", sql);

    let mut manual = sql.to_string();
    manual.replace_range(11..15, "FROM");
    manual.replace_range(0..6, "SELECT");
    assert_eq!(outcome.text, manual);
    assert_eq!(outcome.applied, 2);
}

/// A rule whose fix never clears its own violation: the batch loop must stop
/// on the no-change fixed point, not spin to the iteration bound.
struct StubbornRule {
    metadata: RuleMetadata,
}

impl StubbornRule {
    fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "stubborn-rule",
                "test rule with an ineffective fix",
                RuleCategory::Style,
                Severity::Warning,
                true,
            ),
        }
    }
}

impl sqlcheck_core::Rule for StubbornRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        if ctx.text().is_empty() {
            return Vec::new();
        }
        vec![self.metadata.diagnostic(
            Range::new(Position::new(0, 0), Position::new(0, 1)),
            "always unhappy",
        )]
    }

    fn fixes(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Vec<Fix> {
        // Rewrites the first character to itself.
        let existing = &ctx.text()[0..1];
        Fix::new("no-op", vec![TextEdit::replace(diagnostic.range, existing)])
            .map(|fix| vec![fix])
            .unwrap_or_default()
    }
}

#[test]
fn ineffective_fix_reaches_fixed_point_not_iteration_bound() {
    let engine = Engine::new(
        vec![RuleSelection {
            rule: Arc::new(StubbornRule::new()),
            settings: RuleSettings::new(),
        }],
        RunOptions::default(),
    );
    let outcome = engine.fix_all("test.sql", "SELECT 1;");
    assert!(!outcome.changed);
    assert_eq!(outcome.passes, 1);
}

/// Emits two diagnostics whose fixes overlap; the composer must apply the
/// first and report the second unresolved.
struct OverlappingFixesRule {
    metadata: RuleMetadata,
}

impl OverlappingFixesRule {
    fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "overlapping-fixes",
                "test rule with conflicting fixes",
                RuleCategory::Style,
                Severity::Warning,
                true,
            ),
        }
    }
}

impl sqlcheck_core::Rule for OverlappingFixesRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, _ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        vec![
            self.metadata.diagnostic(
                Range::new(Position::new(0, 0), Position::new(0, 5)),
                "first",
            ),
            self.metadata.diagnostic(
                Range::new(Position::new(0, 3), Position::new(0, 8)),
                "second",
            ),
        ]
    }

    fn fixes(&self, _ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Vec<Fix> {
        Fix::new("blank out", vec![TextEdit::replace(diagnostic.range, "_____")])
            .map(|fix| vec![fix])
            .unwrap_or_default()
    }
}

#[test]
fn conflicting_fix_is_dropped_and_reported_unresolved() {
    let engine = Engine::new(
        vec![RuleSelection {
            rule: Arc::new(OverlappingFixesRule::new()),
            settings: RuleSettings::new(),
        }],
        RunOptions::default(),
    );
    let outcome = engine.fix_pass("test.sql", "SELECT 1;");
    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.unresolved.len(), 1);
    assert_eq!(outcome.unresolved[0].message, "second");
    // First-claimed edit applied; the rest of the text is untouched.
    assert_eq!(outcome.text, "_____T 1;");
}
