//! Property tests: analysis determinism, range validity, and composer
//! non-corruption under conflicting edits.

use proptest::prelude::*;
use sqlcheck_core::{
    apply_fixes, Diagnostic, Engine, Fix, LineIndex, RuleCategory, RuleMetadata, RuleRegistry,
    RunOptions, Severity, SourceDocument, TextEdit,
};

fn engine() -> Engine {
    Engine::from_registry(&RuleRegistry::builtin(), RunOptions::default())
}

proptest! {
    /// Analyze run twice on the same input yields the identical diagnostic
    /// sequence: same order, same ranges.
    #[test]
    fn analysis_is_deterministic(
        table_a in "[a-z]{1,6}",
        table_b in "[a-z]{1,6}",
        column in "[a-z]{1,6}",
        literal in "[a-zA-Z0-9éüñ]{0,8}",
    ) {
        prop_assume!(table_a != table_b);
        let sql = format!(
            "SELECT {column}, {table_b}.x FROM {table_a}, {table_b} WHERE {column} = '{literal}'"
        );
        let engine = engine();
        let first = engine.analyze("prop.sql", &sql);
        let second = engine.analyze("prop.sql", &sql);
        prop_assert_eq!(first.diagnostics, second.diagnostics);
    }

    /// Every emitted diagnostic has an ordered range that maps into the
    /// document.
    #[test]
    fn emitted_ranges_are_valid(
        table_a in "[a-z]{1,6}",
        table_b in "[a-z]{1,6}",
        column in "[a-z]{1,6}",
        keyword in prop::sample::select(vec!["select", "SELECT", "Select"]),
    ) {
        let sql = format!(
            "{keyword} {column} FROM {table_a}, {table_b}\nORDER BY {column}"
        );
        let report = engine().analyze("prop.sql", &sql);
        let document = SourceDocument::parse(&sql);
        for diagnostic in &report.diagnostics {
            prop_assert!(diagnostic.range.start <= diagnostic.range.end);
            prop_assert!(document.offset_of(diagnostic.range.start).is_some());
            prop_assert!(document.offset_of(diagnostic.range.end).is_some());
        }
    }
}

/// One candidate edit described by byte offsets into the subject text.
#[derive(Debug, Clone)]
struct RawEdit {
    start: usize,
    len: usize,
    replacement: String,
}

fn raw_edits(text_len: usize) -> impl Strategy<Value = Vec<RawEdit>> {
    prop::collection::vec(
        (0..=text_len, 0..6usize, "[a-z]{0,4}").prop_map(|(start, len, replacement)| RawEdit {
            start,
            len,
            replacement,
        }),
        0..6,
    )
}

fn metadata() -> RuleMetadata {
    RuleMetadata::new(
        "prop-rule",
        "property test rule",
        RuleCategory::Style,
        Severity::Warning,
        true,
    )
}

/// Independent reference: decide survivors with the same first-claimed-wins
/// contract, then apply them ascending with running offset adjustment.
fn reference_apply(text: &str, edits: &[(usize, usize, String)]) -> (String, usize) {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut survivors: Vec<(usize, usize, String)> = Vec::new();
    for (start, end, replacement) in edits {
        let conflict = claimed
            .iter()
            .any(|(cs, ce)| start < ce && cs < end);
        if conflict {
            continue;
        }
        claimed.push((*start, *end));
        survivors.push((*start, *end, replacement.clone()));
    }
    survivors.sort_by_key(|(start, end, _)| (*start, *end));

    let mut out = text.to_string();
    let mut delta = 0i64;
    for (start, end, replacement) in &survivors {
        let start = (*start as i64 + delta) as usize;
        let end = (*end as i64 + delta) as usize;
        out.replace_range(start..end, replacement);
        delta += replacement.len() as i64 - (end as i64 - start as i64);
    }
    (out, survivors.len())
}

proptest! {
    /// With arbitrary (possibly overlapping) single-edit fixes, the composer
    /// applies exactly the non-conflicting ones and leaves the rest of the
    /// document byte-identical to the reference implementation.
    #[test]
    fn composer_never_corrupts_under_conflicts(
        text in "[a-z \n]{0,40}",
        raw in raw_edits(40),
    ) {
        let index = LineIndex::new(&text);
        let metadata = metadata();

        let mut chosen: Vec<(Diagnostic, Fix)> = Vec::new();
        let mut offsets: Vec<(usize, usize, String)> = Vec::new();
        for edit in &raw {
            let start = edit.start.min(text.len());
            let end = (edit.start + edit.len).min(text.len());
            let range = sqlcheck_core::Range::new(
                index.position_at(&text, start),
                index.position_at(&text, end),
            );
            let Ok(fix) = Fix::new("edit", vec![TextEdit::replace(range, edit.replacement.clone())])
            else {
                continue;
            };
            chosen.push((metadata.diagnostic(range, "prop"), fix));
            offsets.push((start, end, edit.replacement.clone()));
        }

        let outcome = apply_fixes(&text, &chosen);
        let (expected, surviving) = reference_apply(&text, &offsets);

        prop_assert_eq!(&outcome.text, &expected);
        prop_assert_eq!(outcome.applied, surviving);
        prop_assert_eq!(outcome.applied + outcome.unresolved.len(), chosen.len());
    }

    /// Two runs of the composer over the same inputs agree.
    #[test]
    fn composer_is_deterministic(
        text in "[a-z \n]{0,30}",
        raw in raw_edits(30),
    ) {
        let index = LineIndex::new(&text);
        let metadata = metadata();
        let chosen: Vec<(Diagnostic, Fix)> = raw
            .iter()
            .filter_map(|edit| {
                let start = edit.start.min(text.len());
                let end = (edit.start + edit.len).min(text.len());
                let range = sqlcheck_core::Range::new(
                    index.position_at(&text, start),
                    index.position_at(&text, end),
                );
                let fix =
                    Fix::new("edit", vec![TextEdit::replace(range, edit.replacement.clone())])
                        .ok()?;
                Some((metadata.diagnostic(range, "prop"), fix))
            })
            .collect();

        let first = apply_fixes(&text, &chosen);
        let second = apply_fixes(&text, &chosen);
        prop_assert_eq!(first.text, second.text);
        prop_assert_eq!(first.applied, second.applied);
    }
}
