//! semicolon-termination: statements must end with a semicolon.
//!
//! Statement terminators are optional in older dialect levels; the check is
//! gated on compatibility level 100 and above, where unterminated statements
//! are a deprecated construct. The fix inserts a semicolon at the
//! statement's end (an empty-range edit).

use crate::diagnostics::{Diagnostic, Fix, RuleCategory, RuleMetadata, Severity, TextEdit};
use crate::rule::{Rule, RuleContext};
use crate::scan::{is_punctuation, next_significant};
use crate::source::Range;

const MIN_COMPAT_LEVEL: u16 = 100;

pub struct SemicolonTermination {
    metadata: RuleMetadata,
}

impl Default for SemicolonTermination {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "semicolon-termination",
                "Statements should be terminated with a semicolon.",
                RuleCategory::Style,
                Severity::Warning,
                true,
            ),
        }
    }
}

impl Rule for SemicolonTermination {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        if ctx.compat_level() < MIN_COMPAT_LEVEL {
            return Vec::new();
        }
        let Some(statements) = ctx.tree() else {
            return Vec::new();
        };
        let tokens = ctx.tokens();
        let mut out = Vec::new();

        for parsed in statements {
            // Without an aligned token segmentation the statement boundary is
            // not reliable enough to demand a terminator.
            let Some(token_range) = &parsed.tokens else {
                continue;
            };
            let terminated = next_significant(tokens, token_range.end)
                .is_some_and(|next| is_punctuation(&tokens[next], ";"));
            if terminated {
                continue;
            }
            out.push(self.metadata.diagnostic(
                Range::empty(parsed.range.end),
                "Statement is not terminated with a semicolon.",
            ));
        }
        out
    }

    fn fixes(&self, _ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Vec<Fix> {
        Fix::new(
            "Insert ';'",
            vec![TextEdit::insert(diagnostic.range.start, ";")],
        )
        .map(|fix| vec![fix])
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSettings;
    use crate::source::{Position, SourceDocument};

    fn run_at(sql: &str, compat_level: u16) -> Vec<Diagnostic> {
        let document = SourceDocument::parse(sql);
        let settings = RuleSettings::new();
        let ctx = RuleContext::new("test.sql", compat_level, &document, &settings);
        SemicolonTermination::default().analyze(&ctx)
    }

    fn run(sql: &str) -> Vec<Diagnostic> {
        run_at(sql, 150)
    }

    #[test]
    fn flags_unterminated_statement() {
        let diagnostics = run("SELECT a.x FROM a");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range, Range::empty(Position::new(0, 17)));
    }

    #[test]
    fn terminated_statement_is_fine() {
        assert!(run("SELECT a.x FROM a;").is_empty());
    }

    #[test]
    fn flags_only_the_unterminated_one() {
        let diagnostics = run("SELECT 1;\nSELECT 2");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 1);
    }

    #[test]
    fn short_circuits_below_minimum_compat_level() {
        assert!(run_at("SELECT a.x FROM a", 90).is_empty());
    }

    #[test]
    fn trailing_comment_does_not_count_as_termination() {
        let diagnostics = run("SELECT 1 -- note\n");
        assert_eq!(diagnostics.len(), 1);
    }
}
