//! unqualified-join-column: bare column references in join conditions.
//!
//! Same qualification family as `unqualified-column`, applied to `ON`
//! clauses: with several sources joined, `ON k = other_k` reads as a
//! coincidence instead of a key relationship.

use crate::diagnostics::{Diagnostic, RuleCategory, RuleMetadata, Severity};
use crate::rule::{Rule, RuleContext};
use crate::walk::{selects_of, visit_statement_queries};

use super::qualification_helpers::{each_join_condition, each_unqualified_column, flatten_from};

pub struct UnqualifiedJoinColumn {
    metadata: RuleMetadata,
}

impl Default for UnqualifiedJoinColumn {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "unqualified-join-column",
                "Columns in join conditions should name their table or alias.",
                RuleCategory::Correctness,
                Severity::Warning,
                false,
            ),
        }
    }
}

impl Rule for UnqualifiedJoinColumn {
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
                for select in selects_of(query) {
                    if flatten_from(&select.from).len() < 2 {
                        continue;
                    }
                    each_join_condition(&select.from, &mut |on_expr| {
                        each_unqualified_column(on_expr, &mut |ident| {
                            out.push(self.metadata.diagnostic(
                                document.range_of_span(ident.span),
                                format!(
                                    "Column '{}' in a join condition is not qualified with a table name or alias.",
                                    ident.value
                                ),
                            ));
                        });
                    });
                }
            });
        }
        out
    }
}
