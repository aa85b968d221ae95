//! select-star: wildcard column selection.
//!
//! Scans each `SELECT` list at its own paren depth for a `*` wildcard.
//! Asterisks inside nested parentheses belong to a subquery's own scan (or
//! to `COUNT(*)`), and a bounded lookback separates the wildcard from the
//! multiplication operator, including the `TOP n` / `TOP (n)` prefixes.

use crate::diagnostics::{Diagnostic, RuleCategory, RuleMetadata, Severity};
use crate::rule::{Rule, RuleContext};
use crate::scan::{
    depth_map, is_clause_terminator, is_keyword, is_punctuation, lookback, prev_significant,
};
use crate::source::{Token, TokenKind};

pub struct SelectStar {
    metadata: RuleMetadata,
}

impl Default for SelectStar {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "select-star",
                "Select lists should name their columns instead of using a wildcard.",
                RuleCategory::Performance,
                Severity::Warning,
                false,
            ),
        }
    }
}

impl Rule for SelectStar {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let tokens = ctx.tokens();
        let depths = depth_map(tokens);
        let mut out = Vec::new();

        for (index, token) in tokens.iter().enumerate() {
            if !is_keyword(token, "SELECT") {
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
                if is_punctuation(current, ";")
                    || is_keyword(current, "FROM")
                    || is_clause_terminator(current)
                {
                    break;
                }
                if current.kind == TokenKind::Operator
                    && current.text == "*"
                    && wildcard_context(tokens, j)
                {
                    out.push(self.metadata.diagnostic(
                        current.range(),
                        "Wildcard column selection; name the columns explicitly.",
                    ));
                }
            }
        }
        out
    }
}

/// Distinguishes the `*` wildcard from multiplication by looking back at the
/// preceding significant tokens.
fn wildcard_context(tokens: &[Token], star: usize) -> bool {
    let back = lookback(tokens, star, 2);
    let Some(&first) = back.first() else {
        return false;
    };
    let previous = &tokens[first];

    if is_keyword(previous, "SELECT")
        || is_keyword(previous, "DISTINCT")
        || is_keyword(previous, "ALL")
        || is_punctuation(previous, ",")
        || is_punctuation(previous, ".")
    {
        return true;
    }

    // SELECT TOP 10 *
    if previous.kind == TokenKind::Literal {
        return back
            .get(1)
            .is_some_and(|&second| is_keyword(&tokens[second], "TOP"));
    }

    // SELECT TOP (10) *
    if is_punctuation(previous, ")") {
        let mut depth = 1i32;
        let mut cursor = first;
        while cursor > 0 && depth > 0 {
            cursor -= 1;
            if is_punctuation(&tokens[cursor], ")") {
                depth += 1;
            } else if is_punctuation(&tokens[cursor], "(") {
                depth -= 1;
            }
        }
        if depth == 0 {
            return prev_significant(tokens, cursor)
                .is_some_and(|before| is_keyword(&tokens[before], "TOP"));
        }
    }

    false
}
