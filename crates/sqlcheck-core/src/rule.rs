//! Rule trait and per-document analysis context.

use crate::diagnostics::{Diagnostic, Fix, RuleMetadata};
use crate::source::{ParsedStatement, SourceDocument, Token};
use std::collections::BTreeMap;

/// Resolved per-rule settings, as handed down by the (external)
/// configuration layer.
pub type RuleSettings = BTreeMap<String, serde_json::Value>;

/// Context provided to rules during analysis.
///
/// Constructed once per document per run and immutable thereafter; rules must
/// not retain state across invocations on different documents.
pub struct RuleContext<'a> {
    file_path: &'a str,
    compat_level: u16,
    document: &'a SourceDocument,
    settings: &'a RuleSettings,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        file_path: &'a str,
        compat_level: u16,
        document: &'a SourceDocument,
        settings: &'a RuleSettings,
    ) -> Self {
        Self {
            file_path,
            compat_level,
            document,
            settings,
        }
    }

    pub fn file_path(&self) -> &'a str {
        self.file_path
    }

    /// Numeric dialect-version gate. Rules depending on features introduced
    /// at a given version must short-circuit below their minimum.
    pub fn compat_level(&self) -> u16 {
        self.compat_level
    }

    pub fn document(&self) -> &'a SourceDocument {
        self.document
    }

    /// The parsed statement tree, absent when parsing failed entirely.
    pub fn tree(&self) -> Option<&'a [ParsedStatement]> {
        self.document
            .has_tree()
            .then(|| self.document.statements())
    }

    /// The full token sequence, available even on parse failure.
    pub fn tokens(&self) -> &'a [Token] {
        self.document.tokens()
    }

    pub fn text(&self) -> &'a str {
        self.document.text()
    }

    /// Typed accessor for a boolean rule setting.
    pub fn option_bool(&self, name: &str) -> Option<bool> {
        self.settings.get(name).and_then(serde_json::Value::as_bool)
    }

    /// Typed accessor for a string rule setting.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.settings.get(name).and_then(serde_json::Value::as_str)
    }

    /// Typed accessor for an integer rule setting.
    pub fn option_u64(&self, name: &str) -> Option<u64> {
        self.settings.get(name).and_then(serde_json::Value::as_u64)
    }
}

/// A single check over a source document.
///
/// Rules are pure functions of their inputs: `analyze` run twice on the same
/// context yields the identical diagnostic sequence, and nothing may be
/// cached across documents. Built-in and plugin rules present this same
/// contract.
pub trait Rule: Send + Sync {
    /// Static description of this rule.
    fn metadata(&self) -> &RuleMetadata;

    /// Inspects the document and returns all violations found, in a stable
    /// order.
    fn analyze(&self, ctx: &RuleContext<'_>) -> Vec<Diagnostic>;

    /// Offers fixes for one of this rule's diagnostics. The first fix is the
    /// one a batch pass applies.
    fn fixes(&self, _ctx: &RuleContext<'_>, _diagnostic: &Diagnostic) -> Vec<Fix> {
        Vec::new()
    }
}
