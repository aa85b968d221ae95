//! Error types for the rule engine.
//!
//! # Error Handling Strategy
//!
//! This crate uses two complementary error handling patterns:
//!
//! - Typed errors ([`FixError`], [`RegistryError`]) for API misuse that must
//!   fail fast: constructing a [`crate::Fix`] with overlapping edits, or
//!   registering two rules under the same id. Returned as `Result<T, E>`.
//!
//! - [`crate::Diagnostic`]: findings collected during analysis, including
//!   parse failures (reserved code `parse-error`). These are accumulated and
//!   returned alongside successful results, so a broken script still yields a
//!   usable report from the token-level rules.

use crate::source::Range;
use thiserror::Error;

/// Error raised when a [`crate::Fix`] violates its construction invariants.
#[derive(Debug, Clone, Error)]
pub enum FixError {
    /// Two edits within one fix span overlapping source ranges.
    #[error("fix '{title}' contains overlapping edits at {range:?}")]
    OverlappingEdits {
        /// Title of the offending fix.
        title: String,
        /// Range of the second edit in the overlapping pair.
        range: Range,
    },
}

/// Error raised by [`crate::RuleRegistry`] operations.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A rule with the same id is already registered. Duplicate ids across
    /// built-ins and plugins are a configuration error.
    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(String),
}
