//! Diagnostic and fix data model.
//!
//! Pure data with no behavior beyond equality and ordering. The two
//! construction-time invariants live here: a [`Range`] is ordered, and a
//! [`Fix`]'s edits are sorted and non-overlapping or the constructor fails.

use crate::error::FixError;
use crate::source::{Position, Range};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reserved diagnostic codes not tied to any rule.
pub mod codes {
    /// Surfaced for parser/tokenizer failures (§ error handling).
    pub const PARSE_ERROR: &str = "parse-error";
}

/// Severity of a diagnostic, ordered `Info < Warning < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Broad grouping used for rule selection and reporting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Correctness,
    Style,
    Performance,
    Portability,
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correctness => write!(f, "correctness"),
            Self::Style => write!(f, "style"),
            Self::Performance => write!(f, "performance"),
            Self::Portability => write!(f, "portability"),
        }
    }
}

/// Immutable description of a rule; one instance per rule type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetadata {
    /// Stable machine-readable id (e.g. "implicit-join").
    pub rule_id: String,
    /// Human-readable description of what the rule checks.
    pub description: String,
    pub category: RuleCategory,
    pub default_severity: Severity,
    /// True when the rule can offer fixes for its diagnostics.
    pub fixable: bool,
}

impl RuleMetadata {
    pub fn new(
        rule_id: impl Into<String>,
        description: impl Into<String>,
        category: RuleCategory,
        default_severity: Severity,
        fixable: bool,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            category,
            default_severity,
            fixable,
        }
    }

    /// Builds a diagnostic for this rule at `range`. Severity is left unset,
    /// meaning "use the rule's default".
    pub fn diagnostic(&self, range: Range, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            range,
            severity: None,
            code: self.rule_id.clone(),
            message: message.into(),
            data: DiagnosticData {
                rule_id: self.rule_id.clone(),
                category: self.category,
                fixable: self.fixable,
            },
        }
    }
}

/// Rule provenance carried on every diagnostic for the reporting layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticData {
    pub rule_id: String,
    pub category: RuleCategory,
    pub fixable: bool,
}

/// A located, coded report of a rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    /// `None` means "use the rule's default"; the engine resolves it before
    /// a report leaves the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub code: String,
    pub message: String,
    pub data: DiagnosticData,
}

impl Diagnostic {
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// A replacement of the text spanned by `range` with `new_text`.
///
/// An empty range is a pure insertion; empty `new_text` is a pure deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    pub fn insert(position: Position, new_text: impl Into<String>) -> Self {
        Self {
            range: Range::empty(position),
            new_text: new_text.into(),
        }
    }

    pub fn delete(range: Range) -> Self {
        Self {
            range,
            new_text: String::new(),
        }
    }
}

/// A named, composable set of text edits remediating one diagnostic.
///
/// Construction sorts the edits by start position and rejects overlapping
/// pairs, so an invalid fix fails fast instead of corrupting text at apply
/// time. Edits of a valid fix are order-independent on the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    title: String,
    edits: Vec<TextEdit>,
}

impl Fix {
    pub fn new(title: impl Into<String>, mut edits: Vec<TextEdit>) -> Result<Self, FixError> {
        let title = title.into();
        edits.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then(a.range.end.cmp(&b.range.end))
        });
        for pair in edits.windows(2) {
            if pair[0].range.end > pair[1].range.start {
                return Err(FixError::OverlappingEdits {
                    title,
                    range: pair[1].range,
                });
            }
        }
        Ok(Self { title, edits })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Edits sorted by start position.
    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }
}
