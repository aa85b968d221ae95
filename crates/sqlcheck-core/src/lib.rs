//! Rule execution engine for T-SQL static analysis and auto-remediation.
//!
//! Given a script, the engine builds a dual tree/token [`SourceDocument`],
//! runs every selected [`Rule`] against it, and aggregates precisely located
//! [`Diagnostic`]s, optionally paired with composable [`Fix`]es that the
//! composer merges into one consistent rewrite of the text.

pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fixer;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod scan;
pub mod source;
pub mod walk;

pub use diagnostics::{
    codes, Diagnostic, DiagnosticData, Fix, RuleCategory, RuleMetadata, Severity, TextEdit,
};
pub use engine::{
    Engine, FileReport, FixAllOutcome, RuleFailure, RuleSelection, RunOptions, MAX_FIX_PASSES,
};
pub use error::{FixError, RegistryError};
pub use fixer::{apply_fixes, ComposeOutcome};
pub use registry::RuleRegistry;
pub use rule::{Rule, RuleContext, RuleSettings};
pub use source::{
    LineIndex, ParsedStatement, Position, Range, SourceDocument, Token, TokenKind,
};
