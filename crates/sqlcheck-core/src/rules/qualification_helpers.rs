//! Shared helpers for rules that reason about FROM-clause table sources.
//!
//! Used by the qualification rules (detection) and the scope-tracking rules
//! (binding-name collection), so all of them agree on how a join tree
//! flattens and what a source is called.

use sqlparser::ast::{Expr, ObjectName, TableFactor, TableWithJoins};

use crate::walk::{join_on_expr, shallow_visit_expr};

/// Recursively flattens a FROM clause's join trees into a flat list of table
/// sources, left to right. A join node contributes its left and right
/// operands recursively; a non-join source contributes itself.
pub fn flatten_from<'a>(from: &'a [TableWithJoins]) -> Vec<&'a TableFactor> {
    let mut sources = Vec::new();
    for table_with_joins in from {
        flatten_table_with_joins(table_with_joins, &mut sources);
    }
    sources
}

fn flatten_table_with_joins<'a>(
    table_with_joins: &'a TableWithJoins,
    sources: &mut Vec<&'a TableFactor>,
) {
    flatten_table_factor(&table_with_joins.relation, sources);
    for join in &table_with_joins.joins {
        flatten_table_factor(&join.relation, sources);
    }
}

fn flatten_table_factor<'a>(table_factor: &'a TableFactor, sources: &mut Vec<&'a TableFactor>) {
    match table_factor {
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => flatten_table_with_joins(table_with_joins, sources),
        other => sources.push(other),
    }
}

/// The alias a source was given in the FROM clause, if any.
pub fn table_factor_alias(table_factor: &TableFactor) -> Option<&str> {
    match table_factor {
        TableFactor::Table { alias, .. }
        | TableFactor::Derived { alias, .. }
        | TableFactor::NestedJoin { alias, .. } => {
            alias.as_ref().map(|alias| alias.name.value.as_str())
        }
        _ => None,
    }
}

/// The name a source is referred to by: its alias when present, otherwise
/// the trailing part of its table name. Cleaned and upper-cased.
pub fn binding_name(table_factor: &TableFactor) -> Option<String> {
    if let Some(alias) = table_factor_alias(table_factor) {
        let clean = clean_identifier(alias);
        return (!clean.is_empty()).then_some(clean);
    }
    if let TableFactor::Table { name, .. } = table_factor {
        return object_name_parts(name).pop();
    }
    None
}

/// Splits an object name into cleaned, upper-cased identifier parts.
pub fn object_name_parts(name: &ObjectName) -> Vec<String> {
    let mut parts = Vec::new();
    for part in &name.0 {
        let raw = match part.as_ident() {
            Some(ident) => ident.value.clone(),
            None => part.to_string(),
        };
        append_dotted_parts(&raw, &mut parts);
    }
    parts
}

/// Splits an already-rendered dotted name (e.g. an INSERT target) the same
/// way as [`object_name_parts`].
pub fn dotted_name_parts(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    append_dotted_parts(raw, &mut parts);
    parts
}

fn append_dotted_parts(raw: &str, parts: &mut Vec<String>) {
    for segment in raw.split('.') {
        let clean = clean_identifier(segment);
        if !clean.is_empty() {
            parts.push(clean);
        }
    }
}

/// Strips quoting characters and normalizes case for comparison.
pub fn clean_identifier(raw: &str) -> String {
    raw.trim()
        .trim_matches(|ch| matches!(ch, '"' | '`' | '\'' | '[' | ']'))
        .to_ascii_uppercase()
}

/// Invokes `visitor` with the ON-condition of every join in `from`,
/// including joins nested inside parenthesized join trees.
pub fn each_join_condition<F: FnMut(&Expr)>(from: &[TableWithJoins], visitor: &mut F) {
    for table_with_joins in from {
        join_conditions_of(table_with_joins, visitor);
    }
}

fn join_conditions_of<F: FnMut(&Expr)>(table_with_joins: &TableWithJoins, visitor: &mut F) {
    if let TableFactor::NestedJoin {
        table_with_joins: nested,
        ..
    } = &table_with_joins.relation
    {
        join_conditions_of(nested, visitor);
    }
    for join in &table_with_joins.joins {
        if let TableFactor::NestedJoin {
            table_with_joins: nested,
            ..
        } = &join.relation
        {
            join_conditions_of(nested, visitor);
        }
        if let Some(on_expr) = join_on_expr(&join.join_operator) {
            visitor(on_expr);
        }
    }
}

/// Invokes `visitor` for every single-part column reference in `expr`,
/// without descending into subqueries (those have their own scope). T-SQL
/// variables (`@x`) are not column references and are skipped.
pub fn each_unqualified_column<F: FnMut(&sqlparser::ast::Ident)>(expr: &Expr, visitor: &mut F) {
    shallow_visit_expr(expr, &mut |candidate| {
        if let Expr::Identifier(ident) = candidate {
            if !ident.value.starts_with('@') {
                visitor(ident);
            }
        }
    });
}
