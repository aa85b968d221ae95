//! implicit-join: comma-separated tables in a FROM list.
//!
//! Purely lexical: after a `FROM` keyword, a bare comma at the clause's base
//! paren depth separates two table sources without a `JOIN`, which hides the
//! join condition in the `WHERE` clause (or loses it entirely). Commas inside
//! nested parentheses belong to subqueries or argument lists and are ignored;
//! the scan stops at clause terminators or a semicolon.

use crate::diagnostics::{Diagnostic, RuleCategory, RuleMetadata, Severity};
use crate::rule::{Rule, RuleContext};
use crate::scan::{depth_map, is_clause_terminator, is_keyword, is_punctuation, lookback};
use crate::source::Token;

pub struct ImplicitJoin {
    metadata: RuleMetadata,
}

impl Default for ImplicitJoin {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "implicit-join",
                "Tables should be joined with explicit JOIN syntax, not commas in the FROM list.",
                RuleCategory::Style,
                Severity::Warning,
                false,
            ),
        }
    }
}

impl Rule for ImplicitJoin {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let tokens = ctx.tokens();
        let depths = depth_map(tokens);
        let mut out = Vec::new();

        for (index, token) in tokens.iter().enumerate() {
            if !is_keyword(token, "FROM") {
                continue;
            }
            let base = depths[index];
            for j in index + 1..tokens.len() {
                let current = &tokens[j];
                if current.is_trivia() {
                    continue;
                }
                if depths[j] < base {
                    break;
                }
                if depths[j] > base {
                    continue;
                }
                if is_punctuation(current, ";") || is_clause_terminator(current) {
                    break;
                }
                if is_punctuation(current, ",") && !preceded_by_join(tokens, j) {
                    out.push(self.metadata.diagnostic(
                        current.range(),
                        "Implicit join: use an explicit JOIN instead of a comma-separated FROM list.",
                    ));
                }
            }
        }
        out
    }
}

fn preceded_by_join(tokens: &[Token], comma: usize) -> bool {
    lookback(tokens, comma, 3)
        .into_iter()
        .any(|index| is_keyword(&tokens[index], "JOIN"))
}
