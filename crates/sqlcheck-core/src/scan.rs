//! Token scanning utilities for lexical rules.
//!
//! Rules that do not need tree shape scan the flat token sequence directly,
//! skipping trivia and tracking bracket nesting with an explicit depth
//! counter. The helpers here keep that bookkeeping in one place.

use crate::source::{Token, TokenKind};

/// Keywords that terminate a clause-level scan (e.g. the end of a `FROM`
/// list). Statement-starting keywords are included so a scan never leaks
/// into the next statement even without a separating semicolon.
pub const CLAUSE_TERMINATORS: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "HAVING", "UNION", "EXCEPT", "INTERSECT", "SELECT", "INSERT",
    "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP", "DECLARE", "SET", "BEGIN", "COMMIT",
    "ROLLBACK", "END", "GO",
];

/// Returns true if `token` is the given keyword, case-insensitively.
pub fn is_keyword(token: &Token, word: &str) -> bool {
    token.kind == TokenKind::Keyword && token.text.eq_ignore_ascii_case(word)
}

/// Returns true if `token` is the given punctuation text.
pub fn is_punctuation(token: &Token, text: &str) -> bool {
    token.kind == TokenKind::Punctuation && token.text == text
}

/// Returns true if `token` ends a clause-level scan.
pub fn is_clause_terminator(token: &Token) -> bool {
    token.kind == TokenKind::Keyword
        && CLAUSE_TERMINATORS
            .iter()
            .any(|word| token.text.eq_ignore_ascii_case(word))
}

/// Paren depth of every token. An opening paren carries the depth of its
/// enclosing scope; the tokens inside it carry one more; the matching closing
/// paren is back at the enclosing depth.
pub fn depth_map(tokens: &[Token]) -> Vec<i32> {
    let mut depths = Vec::with_capacity(tokens.len());
    let mut depth = 0i32;
    for token in tokens {
        if is_punctuation(token, ")") {
            depth -= 1;
        }
        depths.push(depth);
        if is_punctuation(token, "(") {
            depth += 1;
        }
    }
    depths
}

/// Index of the first significant (non-trivia) token at or after `from`.
pub fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&index| !tokens[index].is_trivia())
}

/// Index of the last significant token strictly before `before`.
pub fn prev_significant(tokens: &[Token], before: usize) -> Option<usize> {
    (0..before.min(tokens.len())).rev().find(|&index| !tokens[index].is_trivia())
}

/// Up to `limit` significant token indices before `before`, nearest first.
pub fn lookback(tokens: &[Token], before: usize, limit: usize) -> Vec<usize> {
    let mut found = Vec::with_capacity(limit);
    let mut cursor = before;
    while found.len() < limit {
        let Some(index) = prev_significant(tokens, cursor) else {
            break;
        };
        found.push(index);
        cursor = index;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceDocument;

    #[test]
    fn depth_map_tracks_nesting() {
        let document = SourceDocument::parse("SELECT COUNT(*) FROM t");
        let tokens = document.tokens();
        let depths = depth_map(tokens);

        let star = tokens
            .iter()
            .position(|token| token.text == "*")
            .expect("star token");
        assert_eq!(depths[star], 1);

        let from = tokens
            .iter()
            .position(|token| is_keyword(token, "FROM"))
            .expect("from token");
        assert_eq!(depths[from], 0);
    }

    #[test]
    fn lookback_skips_trivia() {
        let document = SourceDocument::parse("SELECT a /* c */ , b FROM t");
        let tokens = document.tokens();
        let comma = tokens
            .iter()
            .position(|token| is_punctuation(token, ","))
            .expect("comma");
        let back = lookback(tokens, comma, 2);
        assert_eq!(tokens[back[0]].text, "a");
        assert!(is_keyword(&tokens[back[1]], "SELECT"));
    }
}
