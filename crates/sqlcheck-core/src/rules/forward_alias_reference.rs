//! forward-alias-reference: derived tables referencing bindings that appear
//! later in the enclosing FROM list.
//!
//! A derived table cannot see sources declared to its right; a qualifier
//! that only resolves against one of those is referencing a binding not yet
//! in scope. The database either rejects the script or, worse, resolves the
//! name against an unrelated outer object.
//!
//! Tracking is a stack of per-query frames, each holding the names already
//! bound and visible (`available`) and the names bound by sources appearing
//! later in the same FROM list (`later`, filled by one left-to-right pass
//! before descending). Frames push before a query body is entered and pop on
//! exit, so cycles cannot occur.

use crate::diagnostics::{Diagnostic, RuleCategory, RuleMetadata, Severity};
use crate::rule::{Rule, RuleContext};
use crate::source::SourceDocument;
use crate::walk::shallow_visit_expr;
use sqlparser::ast::{
    Expr, GroupByExpr, OrderByKind, Query, Select, SelectItem, SetExpr, Statement, TableFactor,
};
use std::collections::HashSet;

use super::qualification_helpers::{binding_name, clean_identifier, flatten_from};
use crate::walk::join_on_expr;

pub struct ForwardAliasReference {
    metadata: RuleMetadata,
}

impl Default for ForwardAliasReference {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "forward-alias-reference",
                "Derived tables must not reference sources declared later in the enclosing FROM list.",
                RuleCategory::Correctness,
                Severity::Error,
                false,
            ),
        }
    }
}

struct Frame {
    available: HashSet<String>,
    later: HashSet<String>,
}

impl Rule for ForwardAliasReference {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let Some(statements) = ctx.tree() else {
            return Vec::new();
        };
        let document = ctx.document();
        let mut out = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        for parsed in statements {
            match &parsed.node {
                Statement::Query(query) => {
                    self.check_query(query, &mut stack, document, &mut out)
                }
                Statement::Insert(insert) => {
                    if let Some(ref source) = insert.source {
                        self.check_query(source, &mut stack, document, &mut out);
                    }
                }
                Statement::CreateView { query, .. } => {
                    self.check_query(query, &mut stack, document, &mut out)
                }
                Statement::CreateTable(create) => {
                    if let Some(ref query) = create.query {
                        self.check_query(query, &mut stack, document, &mut out);
                    }
                }
                _ => {}
            }
        }
        out
    }
}

impl ForwardAliasReference {
    fn check_query(
        &self,
        query: &Query,
        stack: &mut Vec<Frame>,
        document: &SourceDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        if let Some(ref with) = query.with {
            for cte in &with.cte_tables {
                self.check_query(&cte.query, stack, document, out);
            }
        }
        self.check_set_expr(&query.body, stack, document, out);
        if let Some(ref order_by) = query.order_by {
            if let OrderByKind::Expressions(exprs) = &order_by.kind {
                for order_expr in exprs {
                    self.check_expr(&order_expr.expr, stack, document, out);
                }
            }
        }
    }

    fn check_set_expr(
        &self,
        body: &SetExpr,
        stack: &mut Vec<Frame>,
        document: &SourceDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        match body {
            SetExpr::Select(select) => self.check_select(select, stack, document, out),
            SetExpr::Query(query) => self.check_query(query, stack, document, out),
            SetExpr::SetOperation { left, right, .. } => {
                self.check_set_expr(left, stack, document, out);
                self.check_set_expr(right, stack, document, out);
            }
            _ => {}
        }
    }

    fn check_select(
        &self,
        select: &Select,
        stack: &mut Vec<Frame>,
        document: &SourceDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        let sources = flatten_from(&select.from);

        // Single left-to-right prepass: every source name starts out in
        // `later` and migrates to `available` as its source is passed.
        let later: HashSet<String> = sources.iter().copied().filter_map(binding_name).collect();
        stack.push(Frame {
            available: HashSet::new(),
            later,
        });

        for factor in sources {
            let name = binding_name(factor);
            if let (Some(name), Some(frame)) = (&name, stack.last_mut()) {
                frame.later.remove(name);
            }
            if let TableFactor::Derived { subquery, .. } = factor {
                self.check_query(subquery, stack, document, out);
            }
            if let (Some(name), Some(frame)) = (name, stack.last_mut()) {
                frame.available.insert(name);
            }
        }

        for table_with_joins in &select.from {
            for join in &table_with_joins.joins {
                if let Some(on_expr) = join_on_expr(&join.join_operator) {
                    self.check_expr(on_expr, stack, document, out);
                }
            }
        }
        for item in &select.projection {
            if let SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } = item {
                self.check_expr(expr, stack, document, out);
            }
        }
        if let Some(ref selection) = select.selection {
            self.check_expr(selection, stack, document, out);
        }
        if let Some(ref having) = select.having {
            self.check_expr(having, stack, document, out);
        }
        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            for expr in exprs {
                self.check_expr(expr, stack, document, out);
            }
        }

        stack.pop();
    }

    /// Checks qualifier references in one expression and descends into its
    /// subqueries with the current scope stack.
    fn check_expr(
        &self,
        expr: &Expr,
        stack: &mut Vec<Frame>,
        document: &SourceDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        shallow_visit_expr(expr, &mut |node| match node {
            Expr::CompoundIdentifier(parts) if parts.len() > 1 => {
                let qualifier = clean_identifier(&parts[0].value);
                if qualifier.is_empty() || parts[0].value.starts_with('@') {
                    return;
                }
                let available = stack.iter().any(|frame| frame.available.contains(&qualifier));
                let later = stack.iter().any(|frame| frame.later.contains(&qualifier));
                if !available && later {
                    out.push(self.metadata.diagnostic(
                        document.range_of_span(parts[0].span),
                        format!(
                            "Reference to '{}' is not in scope yet; it is bound later in the enclosing FROM clause.",
                            parts[0].value
                        ),
                    ));
                }
            }
            Expr::Subquery(subquery)
            | Expr::Exists { subquery, .. }
            | Expr::InSubquery { subquery, .. } => {
                self.check_query(subquery, stack, document, out)
            }
            _ => {}
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSettings;

    fn run(sql: &str) -> Vec<Diagnostic> {
        let document = SourceDocument::parse(sql);
        let settings = RuleSettings::new();
        let ctx = RuleContext::new("test.sql", 150, &document, &settings);
        ForwardAliasReference::default().analyze(&ctx)
    }

    #[test]
    fn flags_derived_table_referencing_later_source() {
        let diagnostics =
            run("SELECT d.val FROM (SELECT c.y AS val FROM t) AS d, c WHERE d.val > 0");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "forward-alias-reference");
        assert!(diagnostics[0].message.contains("'c'"));
    }

    #[test]
    fn allows_reference_to_earlier_source() {
        assert!(run("SELECT d.val FROM c, (SELECT c.y AS val FROM t) AS d").is_empty());
    }

    #[test]
    fn derived_table_own_sources_shadow_later_names() {
        // The inner FROM binds its own `c`, so `c.y` resolves locally.
        assert!(run("SELECT d.val FROM (SELECT c.y AS val FROM c) AS d, c").is_empty());
    }

    #[test]
    fn later_alias_is_tracked_like_a_table_name() {
        let diagnostics = run(
            "SELECT d.val FROM (SELECT late.y AS val FROM t) AS d JOIN c AS late ON late.k = d.val",
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'late'"));
    }

    #[test]
    fn where_clause_subqueries_see_all_sources() {
        // By the time WHERE is reached every source is available.
        assert!(
            run("SELECT a.x FROM a, b WHERE EXISTS (SELECT 1 FROM t WHERE t.k = b.k)").is_empty()
        );
    }

    #[test]
    fn unknown_qualifiers_are_not_this_rules_business() {
        assert!(run("SELECT a.x FROM a WHERE mystery.y = 1").is_empty());
    }
}
