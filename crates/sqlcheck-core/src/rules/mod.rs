//! Built-in rule catalog.

use crate::rule::Rule;

pub mod qualification_helpers;

pub mod cross_database_transaction;
pub mod forward_alias_reference;
pub mod implicit_join;
pub mod keyword_case;
pub mod non_unicode_literal;
pub mod select_star;
pub mod semicolon_termination;
pub mod unqualified_column;
pub mod unqualified_join_column;

/// Returns the built-in rules.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(cross_database_transaction::CrossDatabaseTransaction::default()),
        Box::new(forward_alias_reference::ForwardAliasReference::default()),
        Box::new(implicit_join::ImplicitJoin::default()),
        Box::new(keyword_case::KeywordCase::default()),
        Box::new(non_unicode_literal::NonUnicodeLiteral::default()),
        Box::new(select_star::SelectStar::default()),
        Box::new(semicolon_termination::SemicolonTermination::default()),
        Box::new(unqualified_column::UnqualifiedColumn::default()),
        Box::new(unqualified_join_column::UnqualifiedJoinColumn::default()),
    ]
}
