//! keyword-case: tracked keywords must use a consistent case.
//!
//! Token-level and fixable. Only a curated allowlist of core keywords is
//! checked: the tokenizer classifies many legal identifiers (`name`, `state`,
//! …) as keywords, and rewriting those would churn user code. The policy
//! defaults to upper-case and can be set to `lower` per rule settings.

use crate::diagnostics::{Diagnostic, Fix, RuleCategory, RuleMetadata, Severity, TextEdit};
use crate::rule::{Rule, RuleContext};
use crate::source::TokenKind;

const TRACKED_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "LEFT", "RIGHT", "FULL", "INNER", "OUTER", "CROSS", "ON",
    "GROUP", "BY", "ORDER", "HAVING", "UNION", "INSERT", "INTO", "UPDATE", "DELETE", "CREATE",
    "TABLE", "WITH", "AS", "CASE", "WHEN", "THEN", "ELSE", "END", "AND", "OR", "NOT", "NULL",
    "IS", "IN", "EXISTS", "DISTINCT", "TOP", "LIKE", "BETWEEN", "VALUES", "SET", "DECLARE",
    "BEGIN", "COMMIT", "ROLLBACK", "TRANSACTION", "PROCEDURE",
];

pub struct KeywordCase {
    metadata: RuleMetadata,
}

impl Default for KeywordCase {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "keyword-case",
                "Keywords should use a consistent case style.",
                RuleCategory::Style,
                Severity::Warning,
                true,
            ),
        }
    }
}

fn is_tracked_keyword(value: &str) -> bool {
    TRACKED_KEYWORDS
        .iter()
        .any(|keyword| value.eq_ignore_ascii_case(keyword))
}

fn expected_case(value: &str, ctx: &RuleContext<'_>) -> String {
    match ctx.option_str("policy") {
        Some("lower") => value.to_ascii_lowercase(),
        _ => value.to_ascii_uppercase(),
    }
}

impl Rule for KeywordCase {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for token in ctx.tokens() {
            if token.kind != TokenKind::Keyword || !is_tracked_keyword(&token.text) {
                continue;
            }
            let expected = expected_case(&token.text, ctx);
            if token.text != expected {
                out.push(self.metadata.diagnostic(
                    token.range(),
                    format!("Keyword '{}' should be written '{}'.", token.text, expected),
                ));
            }
        }
        out
    }

    fn fixes(&self, ctx: &RuleContext<'_>, diagnostic: &Diagnostic) -> Vec<Fix> {
        let Some(token) = ctx.document().token_at(diagnostic.range.start) else {
            return Vec::new();
        };
        if token.kind != TokenKind::Keyword || !is_tracked_keyword(&token.text) {
            return Vec::new();
        }
        let expected = expected_case(&token.text, ctx);
        Fix::new(
            format!("Replace with '{expected}'"),
            vec![TextEdit::replace(token.range(), expected)],
        )
        .map(|fix| vec![fix])
        .unwrap_or_default()
    }
}
