//! Fix composition and application.
//!
//! Merges the fixes chosen for a set of diagnostics into one consistent
//! rewrite of the source text, or fails closed when edits conflict. Claiming
//! happens per fix, atomically: a fix whose edits overlap an already-claimed
//! range (or no longer map into the current text) is dropped whole and its
//! diagnostic reported unresolved; a fix is never half-applied.

use crate::diagnostics::{Diagnostic, Fix};
use crate::source::LineIndex;

/// Result of one composer pass over a document.
#[derive(Debug, Clone)]
pub struct ComposeOutcome {
    /// The rewritten text.
    pub text: String,
    /// Number of fixes fully applied.
    pub applied: usize,
    /// Diagnostics whose fix was dropped (conflict or stale range).
    pub unresolved: Vec<Diagnostic>,
    /// True when the output differs from the input text.
    pub changed: bool,
}

#[derive(Debug)]
struct OffsetEdit {
    start: usize,
    end: usize,
    new_text: String,
    order: usize,
}

/// Applies the chosen fixes to `text`, one per retained diagnostic, in
/// diagnostic emission order.
///
/// Edits surviving the claim phase are pairwise non-overlapping (within one
/// fix by construction, across fixes by claiming), so splicing them from the
/// end of the document toward the beginning never invalidates an earlier
/// edit's offsets.
pub fn apply_fixes(text: &str, chosen: &[(Diagnostic, Fix)]) -> ComposeOutcome {
    let index = LineIndex::new(text);
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut accepted: Vec<OffsetEdit> = Vec::new();
    let mut unresolved = Vec::new();
    let mut applied = 0usize;
    let mut order = 0usize;

    'fixes: for (diagnostic, fix) in chosen {
        let mut converted = Vec::with_capacity(fix.edits().len());
        for edit in fix.edits() {
            let start = index.offset_of(text, edit.range.start);
            let end = index.offset_of(text, edit.range.end);
            match (start, end) {
                (Some(start), Some(end)) if start <= end => {
                    converted.push((start, end, edit.new_text.clone()));
                }
                _ => {
                    // Stale range: the edit no longer maps into this text.
                    unresolved.push(diagnostic.clone());
                    continue 'fixes;
                }
            }
        }

        let conflicts = converted.iter().any(|(start, end, _)| {
            claimed
                .iter()
                .any(|(claimed_start, claimed_end)| {
                    overlaps(*start, *end, *claimed_start, *claimed_end)
                })
        });
        if conflicts {
            unresolved.push(diagnostic.clone());
            continue;
        }

        for (start, end, new_text) in converted {
            claimed.push((start, end));
            accepted.push(OffsetEdit {
                start,
                end,
                new_text,
                order,
            });
            order += 1;
        }
        applied += 1;
    }

    accepted.sort_by(|a, b| {
        b.start
            .cmp(&a.start)
            .then(b.end.cmp(&a.end))
            .then(b.order.cmp(&a.order))
    });

    let mut out = text.to_string();
    for edit in &accepted {
        out.replace_range(edit.start..edit.end, &edit.new_text);
    }

    ComposeOutcome {
        changed: out != text,
        text: out,
        applied,
        unresolved,
    }
}

fn overlaps(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start < b_end && b_start < a_end
}
