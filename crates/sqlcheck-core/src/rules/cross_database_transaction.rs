//! cross-database-transaction: one transaction touching several databases.
//!
//! Distributed writes hiding inside an ordinary `BEGIN TRANSACTION` escalate
//! to a distributed transaction at runtime, with very different locking and
//! failure behavior. The rule tracks transaction nesting across the
//! statement sequence and flags every statement that drags a second database
//! into an open transaction.

use crate::diagnostics::{Diagnostic, RuleCategory, RuleMetadata, Severity};
use crate::rule::{Rule, RuleContext};
use crate::source::Range;
use crate::walk::{selects_of, visit_statement_queries};
use sqlparser::ast::{FromTable, Statement, TableFactor};
use std::collections::BTreeSet;

use super::qualification_helpers::{dotted_name_parts, flatten_from, object_name_parts};

pub struct CrossDatabaseTransaction {
    metadata: RuleMetadata,
}

impl Default for CrossDatabaseTransaction {
    fn default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "cross-database-transaction",
                "A transaction should not span more than one database.",
                RuleCategory::Correctness,
                Severity::Warning,
                false,
            ),
        }
    }
}

impl Rule for CrossDatabaseTransaction {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
        let Some(statements) = ctx.tree() else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut depth = 0usize;
        let mut tracker = Tracker::default();

        for parsed in statements {
            match &parsed.node {
                // Nested BEGIN does not reset tracking; the outer scope wins.
                Statement::StartTransaction { .. } => depth += 1,
                Statement::Commit { .. } | Statement::Rollback { .. } => {
                    if depth > 0 {
                        depth -= 1;
                        if depth == 0 {
                            tracker.flush(&self.metadata, &mut out);
                        }
                    }
                }
                node => {
                    if depth > 0 {
                        tracker.record(node, parsed.range);
                    }
                }
            }
        }
        // End of document with the transaction still open reports the same.
        if depth > 0 {
            tracker.flush(&self.metadata, &mut out);
        }
        out
    }
}

/// Resources touched inside the currently open transaction, plus the
/// statements that dragged in anything beyond the first one.
#[derive(Default)]
struct Tracker {
    first: Option<String>,
    touched: BTreeSet<String>,
    offenders: Vec<(Range, String)>,
}

impl Tracker {
    fn record(&mut self, statement: &Statement, range: Range) {
        for resource in statement_resources(statement) {
            if self.first.is_none() {
                self.first = Some(resource.clone());
            }
            self.touched.insert(resource.clone());
            if self.first.as_deref() != Some(resource.as_str()) {
                self.offenders.push((range, resource));
            }
        }
    }

    fn flush(&mut self, metadata: &RuleMetadata, out: &mut Vec<Diagnostic>) {
        if self.touched.len() > 1 {
            let first = self.first.clone().unwrap_or_default();
            for (range, resource) in &self.offenders {
                out.push(metadata.diagnostic(
                    *range,
                    format!(
                        "Statement references '{resource}' inside a transaction that started against '{first}'."
                    ),
                ));
            }
        }
        self.first = None;
        self.touched.clear();
        self.offenders.clear();
    }
}

/// Leading qualifiers of every multi-part table name a statement touches, in
/// encounter order, deduplicated. Single-part names carry no resource.
fn statement_resources(statement: &Statement) -> Vec<String> {
    let mut seen = Vec::new();

    match statement {
        Statement::Insert(insert) => {
            push_resource(&mut seen, dotted_name_parts(&insert.table.to_string()));
        }
        Statement::Update { table, .. } => {
            for factor in flatten_from(std::slice::from_ref(table)) {
                push_table_resource(&mut seen, factor);
            }
        }
        Statement::Delete(delete) => {
            let tables = match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
            };
            for factor in flatten_from(tables) {
                push_table_resource(&mut seen, factor);
            }
        }
        _ => {}
    }

    visit_statement_queries(statement, &mut |query| {
        for select in selects_of(query) {
            for factor in flatten_from(&select.from) {
                push_table_resource(&mut seen, factor);
            }
        }
    });

    seen
}

fn push_table_resource(seen: &mut Vec<String>, factor: &TableFactor) {
    if let TableFactor::Table { name, .. } = factor {
        push_resource(seen, object_name_parts(name));
    }
}

fn push_resource(seen: &mut Vec<String>, parts: Vec<String>) {
    if parts.len() < 2 {
        return;
    }
    let leading = parts[0].clone();
    if !seen.contains(&leading) {
        seen.push(leading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleSettings;
    use crate::source::SourceDocument;

    fn run(sql: &str) -> Vec<Diagnostic> {
        let document = SourceDocument::parse(sql);
        let settings = RuleSettings::new();
        let ctx = RuleContext::new("test.sql", 150, &document, &settings);
        CrossDatabaseTransaction::default().analyze(&ctx)
    }

    #[test]
    fn flags_second_database_in_transaction() {
        let diagnostics = run(
            "BEGIN TRANSACTION; INSERT INTO db1.t1 VALUES (1); INSERT INTO db2.t2 VALUES (1); COMMIT;",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "cross-database-transaction");
        assert!(diagnostics[0].message.contains("DB2"));
        // The diagnostic sits on the second insert, not the first.
        assert!(diagnostics[0].range.start.character > 40);
    }

    #[test]
    fn single_database_transaction_is_fine() {
        assert!(run(
            "BEGIN TRANSACTION; INSERT INTO dbo.a VALUES (1); INSERT INTO dbo.b VALUES (1); COMMIT;"
        )
        .is_empty());
    }

    #[test]
    fn statements_outside_transactions_are_ignored() {
        assert!(run("INSERT INTO db1.t1 VALUES (1); INSERT INTO db2.t2 VALUES (1);").is_empty());
    }

    #[test]
    fn nested_begin_keeps_outer_tracking() {
        let diagnostics = run(
            "BEGIN TRANSACTION; INSERT INTO db1.t1 VALUES (1); BEGIN TRANSACTION; \
             INSERT INTO db2.t2 VALUES (1); COMMIT; INSERT INTO db2.t3 VALUES (1); COMMIT;",
        );
        // Both db2 statements offend against the outer db1 scope.
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn unterminated_transaction_reports_at_end_of_document() {
        let diagnostics = run(
            "BEGIN TRANSACTION; INSERT INTO db1.t1 VALUES (1); INSERT INTO db2.t2 VALUES (1);",
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn rollback_closes_the_scope() {
        let diagnostics = run(
            "BEGIN TRANSACTION; INSERT INTO db1.t1 VALUES (1); ROLLBACK; \
             BEGIN TRANSACTION; INSERT INTO db2.t2 VALUES (1); COMMIT;",
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn select_sources_count_as_touches() {
        let diagnostics = run(
            "BEGIN TRANSACTION; INSERT INTO db1.t1 SELECT x FROM db2.src; COMMIT;",
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("DB2"));
    }
}
