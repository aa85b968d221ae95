//! non-unicode-literal: string literals that lose data in a narrow context.
//!
//! A literal containing non-ASCII code points silently degrades when it is
//! assigned to a `CHAR`/`VARCHAR`/`TEXT` target, cast to a narrow type, or
//! used un-prefixed where the comparison side is not a literal. Declared
//! variable types are tracked (declarations and procedure parameter lists,
//! case-insensitive) and propagated to every assignment and comparison.
//!
//! Detection runs in two passes: a context walk collects the ranges of
//! unsafe literals into a set keyed by source range, then a direct visit of
//! every string literal just checks membership, with no context re-evaluation.

use crate::diagnostics::{Diagnostic, RuleCategory, RuleMetadata, Severity};
use crate::rule::{Rule, RuleContext};
use crate::source::{Range, SourceDocument};
use crate::walk::{declare_assignment_expr, visit_expressions};
use sqlparser::ast::{
    BinaryOperator, DataType, Expr, Set, SetExpr, Statement, Value,
};
use std::collections::{HashMap, HashSet};

pub struct NonUnicodeLiteral {
    metadata: RuleMetadata,
}

impl Default for NonUnicodeLiteral {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "non-unicode-literal",
                "String literals with non-ASCII content need a Unicode-safe literal form and target type.",
                RuleCategory::Portability,
                Severity::Warning,
                false,
            ),
        }
    }
}

impl Rule for NonUnicodeLiteral {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let Some(statements) = ctx.tree() else {
            return Vec::new();
        };
        let document = ctx.document();

        let mut tracker = TypeTracker::default();
        for parsed in statements {
            tracker.collect(&parsed.node, document);
        }

        let mut out = Vec::new();
        for parsed in statements {
            visit_expressions(&parsed.node, &mut |expr| {
                if string_literal(expr).is_none() {
                    return;
                }
                let range = document.range_of(expr);
                if tracker.unsafe_ranges.contains(&range) {
                    out.push(self.metadata.diagnostic(
                        range,
                        "String literal carries non-ASCII content into a non-Unicode context; use an N'...' literal with a wide target type.",
                    ));
                }
            });
        }
        out
    }
}

/// Declared-variable types plus the unsafe-literal range set built by the
/// context pass.
#[derive(Default)]
struct TypeTracker {
    /// Variable name (upper-cased, with its `@`) to "declared type is narrow".
    variables: HashMap<String, bool>,
    unsafe_ranges: HashSet<Range>,
}

impl TypeTracker {
    fn collect(&mut self, statement: &Statement, document: &SourceDocument) {
        match statement {
            Statement::Declare { stmts } => {
                for declare in stmts {
                    let narrow = declare
                        .data_type
                        .as_ref()
                        .map(is_narrow_type)
                        .unwrap_or(false);
                    for name in &declare.names {
                        self.variables.insert(variable_key(&name.value), narrow);
                    }
                    if let Some(expr) =
                        declare.assignment.as_ref().and_then(declare_assignment_expr)
                    {
                        if narrow {
                            self.mark_if_needs_wide(expr, document, false);
                        }
                    }
                }
            }
            Statement::Set(set) => {
                if let Set::SingleAssignment {
                    variable, values, ..
                } = set
                {
                    let narrow = variable
                        .0
                        .first()
                        .and_then(|part| part.as_ident())
                        .map(|ident| self.is_narrow_variable(&ident.value))
                        .unwrap_or(false);
                    if narrow {
                        for value in values {
                            self.mark_if_needs_wide(value, document, false);
                        }
                    }
                }
            }
            Statement::CreateProcedure { params, body, .. } => {
                if let Some(params) = params {
                    for param in params {
                        self.variables.insert(
                            variable_key(&param.name.value),
                            is_narrow_type(&param.data_type),
                        );
                    }
                }
                for inner in body.statements() {
                    self.collect(inner, document);
                }
            }
            Statement::Insert(insert) => {
                // DML targets: VALUES rows inherently require a safe literal.
                if let Some(ref source) = insert.source {
                    if let SetExpr::Values(values) = &*source.body {
                        for row in &values.rows {
                            for expr in row {
                                self.mark_if_needs_wide(expr, document, true);
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        visit_expressions(statement, &mut |expr| {
            self.scan_context(expr, document);
        });
    }

    /// One contextual expression: comparisons, LIKE, IN lists, casts, and
    /// call arguments.
    fn scan_context(&mut self, expr: &Expr, document: &SourceDocument) {
        match expr {
            Expr::BinaryOp {
                left, op, right, ..
            } if is_comparison(op) => {
                self.check_comparison(left, right, document);
                self.check_comparison(right, left, document);
            }
            Expr::Like { expr, pattern, .. } => {
                // LIKE inherently requires safety; a narrow tracked variable
                // on the left makes even a wide pattern lossy.
                let narrow_side = self.expr_is_narrow_variable(expr);
                self.mark_if_needs_wide(pattern, document, !narrow_side);
            }
            Expr::InList { expr, list, .. } => {
                let narrow_side = self.expr_is_narrow_variable(expr);
                let non_literal_side = string_literal(expr).is_none();
                for item in list {
                    if narrow_side {
                        self.mark_if_needs_wide(item, document, false);
                    } else if non_literal_side {
                        self.mark_if_needs_wide(item, document, true);
                    }
                }
            }
            Expr::Cast {
                expr: inner,
                data_type,
                ..
            } => {
                if is_narrow_type(data_type) {
                    self.mark_if_needs_wide(inner, document, false);
                }
            }
            Expr::Convert {
                expr: inner,
                data_type: Some(data_type),
                ..
            } => {
                if is_narrow_type(data_type) {
                    self.mark_if_needs_wide(inner, document, false);
                }
            }
            Expr::Function(function) => {
                if let sqlparser::ast::FunctionArguments::List(arg_list) = &function.args {
                    for arg in &arg_list.args {
                        if let sqlparser::ast::FunctionArg::Unnamed(
                            sqlparser::ast::FunctionArgExpr::Expr(inner),
                        )
                        | sqlparser::ast::FunctionArg::Named {
                            arg: sqlparser::ast::FunctionArgExpr::Expr(inner),
                            ..
                        } = arg
                        {
                            self.mark_if_needs_wide(inner, document, true);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// One side of a comparison: `target` against a `literal` candidate.
    fn check_comparison(&mut self, target: &Expr, candidate: &Expr, document: &SourceDocument) {
        if string_literal(candidate).is_none() {
            return;
        }
        if self.expr_is_narrow_variable(target) {
            // Narrow declared type on the other side: even N'...' is lossy.
            self.mark_if_needs_wide(candidate, document, false);
        } else if string_literal(target).is_none() {
            // Compared against a non-literal of unknown type: the literal
            // itself must carry the wide form.
            self.mark_if_needs_wide(candidate, document, true);
        }
    }

    /// Marks `expr` when it is a string literal whose content needs wide
    /// characters. With `only_unprefixed`, an `N'...'` literal already
    /// satisfies the context and is left alone.
    fn mark_if_needs_wide(&mut self, expr: &Expr, document: &SourceDocument, only_unprefixed: bool) {
        let Some((value, wide)) = string_literal(expr) else {
            return;
        };
        if only_unprefixed && wide {
            return;
        }
        if needs_wide(value) {
            self.unsafe_ranges.insert(document.range_of(expr));
        }
    }

    fn is_narrow_variable(&self, raw: &str) -> bool {
        self.variables
            .get(&variable_key(raw))
            .copied()
            .unwrap_or(false)
    }

    fn expr_is_narrow_variable(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Identifier(ident) if ident.value.starts_with('@') => {
                self.is_narrow_variable(&ident.value)
            }
            _ => false,
        }
    }
}

/// The literal's content, and whether it already uses the wide (`N'...'`)
/// form.
fn string_literal(expr: &Expr) -> Option<(&str, bool)> {
    let Expr::Value(value) = expr else {
        return None;
    };
    match &value.value {
        Value::SingleQuotedString(content) => Some((content, false)),
        Value::NationalStringLiteral(content) => Some((content, true)),
        _ => None,
    }
}

fn needs_wide(content: &str) -> bool {
    content.chars().any(|ch| !ch.is_ascii())
}

fn is_narrow_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Char(_)
            | DataType::Character(_)
            | DataType::Varchar(_)
            | DataType::CharVarying(_)
            | DataType::CharacterVarying(_)
            | DataType::Text
    )
}

fn is_comparison(op: &BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
    )
}

fn variable_key(raw: &str) -> String {
    raw.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSettings;

    fn run(sql: &str) -> Vec<Diagnostic> {
        let document = SourceDocument::parse(sql);
        let settings = RuleSettings::new();
        let ctx = RuleContext::new("test.sql", 150, &document, &settings);
        NonUnicodeLiteral::default().analyze(&ctx)
    }

    #[test]
    fn flags_unicode_assignment_to_narrow_variable() {
        let diagnostics = run("DECLARE @name VARCHAR(40); SET @name = 'café';");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "non-unicode-literal");
    }

    #[test]
    fn wide_variable_accepts_unicode_assignment() {
        assert!(run("DECLARE @name NVARCHAR(40); SET @name = 'café';").is_empty());
    }

    #[test]
    fn ascii_assignment_to_narrow_variable_is_fine() {
        assert!(run("DECLARE @name VARCHAR(40); SET @name = 'cafe';").is_empty());
    }

    #[test]
    fn variable_lookup_is_case_insensitive() {
        let diagnostics = run("DECLARE @Name VARCHAR(40); SET @NAME = 'café';");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn flags_cast_of_unicode_literal_to_narrow_type() {
        let diagnostics = run("SELECT CAST('über' AS VARCHAR(10)) FROM t");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn cast_to_wide_type_is_fine() {
        assert!(run("SELECT CAST('über' AS NVARCHAR(10)) FROM t").is_empty());
    }

    #[test]
    fn flags_unprefixed_comparison_against_column() {
        let diagnostics = run("SELECT a.x FROM a WHERE a.name = 'niño'");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn national_literal_against_column_is_fine() {
        assert!(run("SELECT a.x FROM a WHERE a.name = N'niño'").is_empty());
    }

    #[test]
    fn comparison_with_narrow_variable_flags_even_national_literals() {
        let diagnostics = run("DECLARE @v VARCHAR(10); SELECT 1 WHERE @v = N'Ω';");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn flags_unicode_like_pattern() {
        let diagnostics = run("SELECT a.x FROM a WHERE a.name LIKE '%José%'");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn flags_unicode_in_list_member() {
        let diagnostics = run("SELECT a.x FROM a WHERE a.c IN ('å', 'b')");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn flags_unicode_insert_value() {
        let diagnostics = run("INSERT INTO t VALUES ('ü')");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn national_insert_value_is_fine() {
        assert!(run("INSERT INTO t VALUES (N'ü')").is_empty());
    }

    #[test]
    fn procedure_parameters_feed_the_type_map() {
        let diagnostics = run(
            "CREATE PROCEDURE p (@n VARCHAR(10)) AS BEGIN SET @n = 'ü'; END",
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn literal_to_literal_comparison_is_fine() {
        assert!(run("SELECT 1 WHERE 'é' = 'é'").is_empty());
    }
}
