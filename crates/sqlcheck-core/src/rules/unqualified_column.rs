//! unqualified-column: bare column references with multiple tables in scope.
//!
//! When a query draws from more than one table source, a single-part column
//! reference in the select list, `WHERE`, or `ORDER BY` forces readers (and
//! the binder) to guess which table it comes from, and breaks silently when
//! a column of the same name is later added to another source.

use crate::diagnostics::{Diagnostic, RuleCategory, RuleMetadata, Severity};
use crate::rule::{Rule, RuleContext};
use crate::source::SourceDocument;
use crate::walk::{selects_of, visit_statement_queries};
use sqlparser::ast::{Expr, OrderByKind, Query, Select, SelectItem};
use std::collections::HashSet;

use super::qualification_helpers::{clean_identifier, each_unqualified_column, flatten_from};

pub struct UnqualifiedColumn {
    metadata: RuleMetadata,
}

impl Default for UnqualifiedColumn {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "unqualified-column",
                "Column references should name their table or alias when more than one table is in scope.",
                RuleCategory::Correctness,
                Severity::Warning,
                false,
            ),
        }
    }
}

impl Rule for UnqualifiedColumn {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let Some(statements) = ctx.tree() else {
            return Vec::new();
        };
        let document = ctx.document();
        let mut out = Vec::new();
        for parsed in statements {
            visit_statement_queries(&parsed.node, &mut |query| {
                check_query(query, document, &self.metadata, &mut out);
            });
        }
        out
    }
}

fn check_query(
    query: &Query,
    document: &SourceDocument,
    metadata: &RuleMetadata,
    out: &mut Vec<Diagnostic>,
) {
    let selects = selects_of(query);
    for select in &selects {
        check_select(select, document, metadata, out);
    }

    // ORDER BY hangs off the query, not the select; resolve it against the
    // first select's sources and skip projection aliases, which are legal
    // bare names there.
    let Some(order_by) = &query.order_by else {
        return;
    };
    let OrderByKind::Expressions(order_exprs) = &order_by.kind else {
        return;
    };
    let Some(first) = selects.first() else {
        return;
    };
    if flatten_from(&first.from).len() < 2 {
        return;
    }
    let aliases = projection_aliases(first);
    for order_expr in order_exprs {
        each_unqualified_column(&order_expr.expr, &mut |ident| {
            if aliases.contains(&clean_identifier(&ident.value)) {
                return;
            }
            out.push(flag(document, metadata, ident, "ORDER BY"));
        });
    }
}

fn check_select(
    select: &Select,
    document: &SourceDocument,
    metadata: &RuleMetadata,
    out: &mut Vec<Diagnostic>,
) {
    if flatten_from(&select.from).len() < 2 {
        return;
    }

    for item in &select.projection {
        if let SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } = item {
            flag_in_expr(expr, document, metadata, "select list", out);
        }
    }
    if let Some(selection) = &select.selection {
        flag_in_expr(selection, document, metadata, "WHERE clause", out);
    }
}

fn flag_in_expr(
    expr: &Expr,
    document: &SourceDocument,
    metadata: &RuleMetadata,
    clause: &str,
    out: &mut Vec<Diagnostic>,
) {
    each_unqualified_column(expr, &mut |ident| {
        out.push(flag(document, metadata, ident, clause));
    });
}

fn flag(
    document: &SourceDocument,
    metadata: &RuleMetadata,
    ident: &sqlparser::ast::Ident,
    clause: &str,
) -> Diagnostic {
    metadata.diagnostic(
        document.range_of_span(ident.span),
        format!(
            "Column '{}' in the {clause} is not qualified with a table name or alias.",
            ident.value
        ),
    )
}

fn projection_aliases(select: &Select) -> HashSet<String> {
    select
        .projection
        .iter()
        .filter_map(|item| match item {
            SelectItem::ExprWithAlias { alias, .. } => Some(clean_identifier(&alias.value)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSettings;
    use crate::source::Position;

    fn run(sql: &str) -> Vec<Diagnostic> {
        let document = SourceDocument::parse(sql);
        let settings = RuleSettings::new();
        let ctx = RuleContext::new("test.sql", 150, &document, &settings);
        UnqualifiedColumn::default().analyze(&ctx)
    }

    #[test]
    fn flags_bare_column_with_two_tables() {
        let diagnostics = run("SELECT id FROM a JOIN b ON a.k = b.k");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "unqualified-column");
        assert_eq!(diagnostics[0].range.start, Position::new(0, 7));
        assert_eq!(diagnostics[0].range.end, Position::new(0, 9));
    }

    #[test]
    fn allows_qualified_column_with_two_tables() {
        assert!(run("SELECT a.id FROM a JOIN b ON a.k = b.k").is_empty());
    }

    #[test]
    fn allows_bare_column_with_single_table() {
        assert!(run("SELECT id FROM a WHERE id > 0").is_empty());
    }

    #[test]
    fn flags_bare_column_in_where_clause() {
        let diagnostics = run("SELECT a.id FROM a, b WHERE k = 1");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("WHERE"));
    }

    #[test]
    fn flags_bare_column_in_order_by() {
        let diagnostics = run("SELECT a.id FROM a JOIN b ON a.k = b.k ORDER BY name");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("ORDER BY"));
    }

    #[test]
    fn order_by_projection_alias_is_legal() {
        assert!(run("SELECT a.id AS row_id FROM a JOIN b ON a.k = b.k ORDER BY row_id").is_empty());
    }

    #[test]
    fn variables_are_not_columns() {
        assert!(run("SELECT a.id FROM a JOIN b ON a.k = b.k WHERE a.x = @limit").is_empty());
    }

    #[test]
    fn subquery_scope_is_independent() {
        // The inner query has one source; the bare `id` there is fine.
        assert!(
            run("SELECT a.id FROM a JOIN b ON a.k = b.k WHERE a.id IN (SELECT id FROM c)")
                .is_empty()
        );
    }

    #[test]
    fn nested_multi_table_subquery_is_checked() {
        let diagnostics =
            run("SELECT x.id FROM (SELECT id FROM a JOIN b ON a.k = b.k) AS x");
        assert_eq!(diagnostics.len(), 1);
    }
}
