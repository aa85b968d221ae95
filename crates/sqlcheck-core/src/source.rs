//! Dual-view source model for analyzed scripts.
//!
//! A [`SourceDocument`] is constructed once per script and reused across all
//! rules. It carries the raw text, the parsed statement tree, and the full
//! token sequence (trivia included) with stable positions, so tree-walking
//! and token-scanning rules share one addressing scheme.
//!
//! Positions are 0-based `(line, character)` pairs with `character` counted
//! in UTF-16 code units, matching editor-protocol conventions.

use crate::diagnostics::{codes, Diagnostic, DiagnosticData, RuleCategory, Severity};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{Spanned, Statement};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token as RawToken, Tokenizer, Whitespace};
use std::sync::OnceLock;

/// A 0-based position in a document. `character` is measured in UTF-16 code
/// units within the line, for editor interop.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// 0-based line number.
    pub line: u32,
    /// 0-based UTF-16 code unit offset within the line.
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open range in a document. `end == start` marks an insertion point.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    /// Inclusive start position.
    pub start: Position,
    /// Exclusive end position.
    pub end: Position,
}

impl Range {
    /// Creates a range. `start` must not come after `end`.
    pub fn new(start: Position, end: Position) -> Self {
        assert!(start <= end, "range start must not exceed end");
        Self { start, end }
    }

    /// Creates an empty range (insertion point) at `position`.
    pub fn empty(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Returns true if this range spans no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `position` falls inside this range.
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position < self.end
    }
}

/// Coarse token class emitted by the source model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Literal,
    Operator,
    Punctuation,
    Comment,
    Whitespace,
    Other,
}

/// One lexical unit with its source range. The token sequence for a document
/// is ordered by position and includes trivia (whitespace, comments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: Position,
    pub end: Position,
}

impl Token {
    /// Source range covered by this token.
    pub fn range(&self) -> Range {
        Range::new(self.start, self.end)
    }

    /// Token length in UTF-16 code units.
    pub fn length(&self) -> u32 {
        self.text.chars().map(|ch| ch.len_utf16() as u32).sum()
    }

    /// Returns true for whitespace and comment tokens.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// Byte-offset index of line starts, used to convert between byte offsets,
/// parser locations, and editor positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a position into a byte offset into `text`.
    ///
    /// Fails closed: positions beyond the document, or landing inside a
    /// surrogate pair, yield `None` rather than a wrong offset.
    pub fn offset_of(&self, text: &str, position: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line as usize)?;
        let line_end = self
            .line_starts
            .get(position.line as usize + 1)
            .copied()
            .unwrap_or(text.len());
        let line = &text[line_start..line_end];

        let mut units = 0u32;
        for (byte_offset, ch) in line.char_indices() {
            if units == position.character {
                return Some(line_start + byte_offset);
            }
            if ch == '\n' {
                return None;
            }
            units += ch.len_utf16() as u32;
            if units > position.character {
                return None;
            }
        }
        (units == position.character).then_some(line_start + line.len())
    }

    /// Converts a byte offset (assumed to lie on a char boundary) into a
    /// position.
    pub fn position_at(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(text.len());
        let line = self
            .line_starts
            .partition_point(|start| *start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        let character = text[line_start..offset]
            .chars()
            .map(|ch| ch.len_utf16() as u32)
            .sum();
        Position::new(line as u32, character)
    }

    /// Converts a 1-based parser `(line, column)` location, where the column
    /// counts characters, into a 0-based UTF-16 position. Columns past the
    /// end of the line clamp to the line end (the parser reports EOF there).
    pub(crate) fn position_from_location(&self, text: &str, line: u64, column: u64) -> Option<Position> {
        if line == 0 || column == 0 {
            return None;
        }
        let line_number = (line - 1) as usize;
        let line_start = *self.line_starts.get(line_number)?;
        let line_end = self
            .line_starts
            .get(line_number + 1)
            .copied()
            .unwrap_or(text.len());

        let target_chars = (column - 1) as usize;
        let mut units = 0u32;
        let mut chars = 0usize;
        for ch in text[line_start..line_end].chars() {
            if chars == target_chars || ch == '\n' {
                break;
            }
            units += ch.len_utf16() as u32;
            chars += 1;
        }
        Some(Position::new(line_number as u32, units))
    }
}

/// A parsed statement with its source range and, when the top-level token
/// segmentation lined up with the parser output, the raw token sub-range it
/// covers.
pub struct ParsedStatement {
    pub node: Statement,
    pub range: Range,
    pub tokens: Option<std::ops::Range<usize>>,
}

/// Normalized input model for a single script.
pub struct SourceDocument {
    text: String,
    tokens: Vec<Token>,
    statements: Vec<ParsedStatement>,
    parse_errors: Vec<Diagnostic>,
    tree_available: bool,
    line_index: LineIndex,
}

impl SourceDocument {
    /// Builds a source document from raw script text.
    ///
    /// Tokenization and parsing failures never abort construction: whatever
    /// tokens were produced stay available so lexical rules keep working, and
    /// failures surface as diagnostics with the reserved `parse-error` code.
    pub fn parse(text: &str) -> Self {
        let line_index = LineIndex::new(text);
        let dialect = MsSqlDialect {};
        let mut parse_errors = Vec::new();

        let tokens = match Tokenizer::new(&dialect, text).tokenize_with_location() {
            Ok(raw) => convert_tokens(text, &line_index, raw),
            Err(error) => {
                let position = line_index
                    .position_from_location(
                        text,
                        error.location.line,
                        error.location.column,
                    )
                    .unwrap_or_default();
                parse_errors.push(parse_error_diagnostic(
                    Range::empty(position),
                    error.to_string(),
                ));
                Vec::new()
            }
        };

        let (statements, tree_available) = match Parser::parse_sql(&dialect, text) {
            Ok(parsed) => {
                let statements = attach_statement_ranges(text, &line_index, &tokens, parsed);
                (statements, true)
            }
            Err(error) => {
                let message = error.to_string();
                let position = position_from_parser_message(&message)
                    .and_then(|(line, column)| {
                        line_index.position_from_location(text, line, column)
                    })
                    .unwrap_or_default();
                parse_errors.push(parse_error_diagnostic(Range::empty(position), message));
                (Vec::new(), false)
            }
        };

        Self {
            text: text.to_string(),
            tokens,
            statements,
            parse_errors,
            tree_available,
            line_index,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Parsed statements, empty when parsing failed (see [`Self::has_tree`]).
    pub fn statements(&self) -> &[ParsedStatement] {
        &self.statements
    }

    /// Returns false when the parser failed and no tree exists. A script
    /// with zero statements but a clean parse still has a tree.
    pub fn has_tree(&self) -> bool {
        self.tree_available
    }

    pub fn parse_errors(&self) -> &[Diagnostic] {
        &self.parse_errors
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Source range of any spanned AST node.
    ///
    /// When the node carries no usable end metadata, the end is derived from
    /// the token at the node's start; a node with no span at all degrades to
    /// an empty range at the document start.
    pub fn range_of<N: Spanned>(&self, node: &N) -> Range {
        self.range_of_span(node.span())
    }

    /// Source range of a raw [`Span`], for nodes (e.g. `Ident`) that carry a
    /// span field but do not implement [`Spanned`].
    pub fn range_of_span(&self, span: sqlparser::tokenizer::Span) -> Range {
        let start = self
            .line_index
            .position_from_location(&self.text, span.start.line, span.start.column);
        let Some(start) = start else {
            return Range::empty(Position::default());
        };
        let end = self
            .line_index
            .position_from_location(&self.text, span.end.line, span.end.column)
            .filter(|end| *end >= start);
        match end {
            Some(end) => Range::new(start, end),
            None => match self.token_at(start) {
                Some(token) => Range::new(start, token.end),
                None => Range::empty(start),
            },
        }
    }

    /// The token containing `position`, or starting exactly at it.
    pub fn token_at(&self, position: Position) -> Option<&Token> {
        self.token_index_at(position).map(|index| &self.tokens[index])
    }

    /// Index of the token containing `position`.
    pub fn token_index_at(&self, position: Position) -> Option<usize> {
        let candidate = self.tokens.partition_point(|token| token.start <= position);
        let index = candidate.checked_sub(1)?;
        let token = &self.tokens[index];
        (token.start == position || position < token.end).then_some(index)
    }

    /// Byte offset of a position, failing closed on out-of-bounds input.
    pub fn offset_of(&self, position: Position) -> Option<usize> {
        self.line_index.offset_of(&self.text, position)
    }

    /// Position of a byte offset.
    pub fn position_at(&self, offset: usize) -> Position {
        self.line_index.position_at(&self.text, offset)
    }
}

fn parse_error_diagnostic(range: Range, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(Severity::Error),
        code: codes::PARSE_ERROR.to_string(),
        message,
        data: DiagnosticData {
            rule_id: codes::PARSE_ERROR.to_string(),
            category: RuleCategory::Correctness,
            fixable: false,
        },
    }
}

/// Recovers the 1-based line/column from a sqlparser error message.
///
/// sqlparser reports "… at Line: X, Column: Y"; this parsing is coupled to
/// that format and returns `None` when it is absent.
fn position_from_parser_message(message: &str) -> Option<(u64, u64)> {
    static POSITION_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = POSITION_REGEX.get_or_init(|| {
        Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("invalid position pattern")
    });
    let captures = re.captures(message)?;
    let line: u64 = captures.get(1)?.as_str().parse().ok()?;
    let column: u64 = captures.get(2)?.as_str().parse().ok()?;
    Some((line, column))
}

fn convert_tokens(
    text: &str,
    line_index: &LineIndex,
    raw: Vec<sqlparser::tokenizer::TokenWithSpan>,
) -> Vec<Token> {
    let mut out = Vec::with_capacity(raw.len());
    for token in raw {
        if matches!(token.token, RawToken::EOF) {
            continue;
        }
        let start = line_index.position_from_location(
            text,
            token.span.start.line,
            token.span.start.column,
        );
        let end = line_index.position_from_location(
            text,
            token.span.end.line,
            token.span.end.column,
        );
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        if end < start {
            continue;
        }
        out.push(Token {
            kind: classify_token(&token.token),
            text: token.token.to_string(),
            start,
            end,
        });
    }
    out
}

fn classify_token(token: &RawToken) -> TokenKind {
    match token {
        RawToken::Word(word) if word.keyword != Keyword::NoKeyword => TokenKind::Keyword,
        RawToken::Word(_) => TokenKind::Identifier,
        RawToken::Number(_, _)
        | RawToken::SingleQuotedString(_)
        | RawToken::DoubleQuotedString(_)
        | RawToken::NationalStringLiteral(_)
        | RawToken::EscapedStringLiteral(_)
        | RawToken::HexStringLiteral(_) => TokenKind::Literal,
        RawToken::Eq
        | RawToken::Neq
        | RawToken::Lt
        | RawToken::Gt
        | RawToken::LtEq
        | RawToken::GtEq
        | RawToken::Plus
        | RawToken::Minus
        | RawToken::Mul
        | RawToken::Div
        | RawToken::Mod
        | RawToken::StringConcat => TokenKind::Operator,
        RawToken::Comma
        | RawToken::Period
        | RawToken::LParen
        | RawToken::RParen
        | RawToken::SemiColon
        | RawToken::LBracket
        | RawToken::RBracket
        | RawToken::LBrace
        | RawToken::RBrace
        | RawToken::Colon
        | RawToken::DoubleColon
        | RawToken::Assignment => TokenKind::Punctuation,
        RawToken::Whitespace(Whitespace::SingleLineComment { .. })
        | RawToken::Whitespace(Whitespace::MultiLineComment(_)) => TokenKind::Comment,
        RawToken::Whitespace(_) => TokenKind::Whitespace,
        _ => TokenKind::Other,
    }
}

/// Assigns a source range to each parsed statement.
///
/// Primary path: split the token stream at depth-0 semicolons; when the
/// resulting segment count matches the parsed statement count, each statement
/// spans its segment's first to last significant token. Otherwise fall back
/// to per-node spans, degrading to the previous statement's end for nodes the
/// parser gives no span (e.g. transaction control).
fn attach_statement_ranges(
    text: &str,
    line_index: &LineIndex,
    tokens: &[Token],
    parsed: Vec<Statement>,
) -> Vec<ParsedStatement> {
    let segments = segment_statements(tokens);

    if segments.len() == parsed.len() {
        return parsed
            .into_iter()
            .zip(segments)
            .map(|(node, (first, last))| ParsedStatement {
                node,
                range: Range::new(tokens[first].start, tokens[last].end),
                tokens: Some(first..last + 1),
            })
            .collect();
    }

    let mut previous_end = Position::default();
    parsed
        .into_iter()
        .map(|node| {
            let span = node.span();
            let range = match (
                line_index.position_from_location(text, span.start.line, span.start.column),
                line_index.position_from_location(text, span.end.line, span.end.column),
            ) {
                (Some(start), Some(end)) if start <= end => Range::new(start, end),
                (Some(start), _) => Range::empty(start),
                _ => Range::empty(previous_end),
            };
            previous_end = range.end;
            ParsedStatement {
                node,
                range,
                tokens: None,
            }
        })
        .collect()
}

/// Splits the token stream into per-statement groups of significant tokens,
/// separated by semicolons at paren depth 0.
fn segment_statements(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut segments = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut depth = 0i32;

    for (index, token) in tokens.iter().enumerate() {
        if token.is_trivia() {
            continue;
        }
        if token.kind == TokenKind::Punctuation {
            match token.text.as_str() {
                "(" => depth += 1,
                ")" => depth -= 1,
                ";" if depth == 0 => {
                    if let Some(segment) = current.take() {
                        segments.push(segment);
                    }
                    continue;
                }
                _ => {}
            }
        }
        match &mut current {
            Some((_, last)) => *last = index,
            None => current = Some((index, index)),
        }
    }
    if let Some(segment) = current.take() {
        segments.push(segment);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_zero_based() {
        let document = SourceDocument::parse("SELECT 1;\nSELECT 2;");
        assert!(document.has_tree());
        assert_eq!(document.statements().len(), 2);
        assert_eq!(document.statements()[0].range.start, Position::new(0, 0));
        assert_eq!(document.statements()[1].range.start, Position::new(1, 0));
        assert_eq!(document.statements()[1].range.end, Position::new(1, 8));
    }

    #[test]
    fn tokens_survive_parse_failure() {
        let document = SourceDocument::parse("SELECT FROM WHERE");
        assert!(!document.has_tree());
        assert_eq!(document.parse_errors().len(), 1);
        assert_eq!(document.parse_errors()[0].code, codes::PARSE_ERROR);
        assert!(document
            .tokens()
            .iter()
            .any(|token| token.kind == TokenKind::Keyword && token.text.eq_ignore_ascii_case("from")));
    }

    #[test]
    fn token_sequence_includes_trivia() {
        let document = SourceDocument::parse("SELECT 1 -- trailing\n");
        assert!(document
            .tokens()
            .iter()
            .any(|token| token.kind == TokenKind::Comment));
        assert!(document
            .tokens()
            .iter()
            .any(|token| token.kind == TokenKind::Whitespace));
    }

    #[test]
    fn statement_segmentation_ignores_nested_semicolons_in_strings() {
        let document = SourceDocument::parse("SELECT ';'; SELECT 2;");
        assert_eq!(document.statements().len(), 2);
        assert!(document.statements().iter().all(|s| s.tokens.is_some()));
    }

    #[test]
    fn offset_round_trip_counts_utf16_units() {
        let text = "SELECT 'café' AS c\nFROM t";
        let index = LineIndex::new(text);
        let offset = text.find('é').unwrap();
        let position = index.position_at(text, offset);
        assert_eq!(position, Position::new(0, 11));
        assert_eq!(index.offset_of(text, position), Some(offset));
    }

    #[test]
    fn surrogate_pair_counts_two_units() {
        let text = "SELECT '😀x'";
        let index = LineIndex::new(text);
        let offset = text.find('x').unwrap();
        let position = index.position_at(text, offset);
        assert_eq!(position.character, 10);
        assert_eq!(index.offset_of(text, position), Some(offset));
    }

    #[test]
    fn offset_of_fails_closed_out_of_bounds() {
        let text = "SELECT 1";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_of(text, Position::new(5, 0)), None);
        assert_eq!(index.offset_of(text, Position::new(0, 99)), None);
    }

    #[test]
    fn token_at_finds_covering_token() {
        let document = SourceDocument::parse("SELECT id FROM t");
        let token = document.token_at(Position::new(0, 7)).expect("token");
        assert_eq!(token.text, "id");
        assert_eq!(token.kind, TokenKind::Identifier);
    }

    #[test]
    fn range_of_reports_expression_spans() {
        let document = SourceDocument::parse("SELECT col FROM t");
        let statement = &document.statements()[0].node;
        let range = document.range_of(statement);
        assert_eq!(range.start, Position::new(0, 0));
        assert!(range.end >= Position::new(0, 10));
    }

    #[test]
    #[should_panic(expected = "range start must not exceed end")]
    fn range_construction_rejects_inverted_bounds() {
        let _ = Range::new(Position::new(1, 0), Position::new(0, 0));
    }
}
