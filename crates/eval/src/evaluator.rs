//! Scoring of extracted characters and dialogs against ground truth.

use extract::{DialogAttribution, normalize_dialog, normalize_name};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::metrics::EvaluationMetrics;

/// Leading tokens compared when one side of a dialog was cut short
const PREFIX_TOKENS: usize = 5;
const MIN_PREFIX_TOKENS: usize = 3;

fn name_set<S: AsRef<str>>(names: &[S]) -> HashSet<String> {
    names.iter().map(|n| normalize_name(n.as_ref())).collect()
}

/// Case-insensitive, whitespace-trimmed set comparison of character names
pub fn evaluate_characters<A, B>(extracted: &[A], expected: &[B]) -> EvaluationMetrics
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let extracted = name_set(extracted);
    let expected = name_set(expected);
    let true_positives = extracted.intersection(&expected).count();

    EvaluationMetrics::from_counts(true_positives, extracted.len(), expected.len())
}

/// Whether two dialog lines say the same thing, ignoring case and punctuation
pub fn dialogs_match(extracted: &str, expected: &str) -> bool {
    normalized_match(&normalize_dialog(extracted), &normalize_dialog(expected))
}

fn normalized_match(a: &str, b: &str) -> bool {
    if a == b || a.contains(b) || b.contains(a) {
        return true;
    }

    let a_words: Vec<&str> = a.split_whitespace().take(PREFIX_TOKENS).collect();
    let b_words: Vec<&str> = b.split_whitespace().take(PREFIX_TOKENS).collect();
    a_words.len() >= MIN_PREFIX_TOKENS && a_words == b_words
}

/// Content-based dialog scoring; speakers are not compared.
///
/// Matching is greedy: each extracted line, in order, binds to the first
/// still-unmatched expected line it matches. This is a deterministic one-to-one
/// approximation, not an optimal assignment.
pub fn evaluate_dialogs(
    extracted: &[DialogAttribution],
    expected: &[DialogAttribution],
) -> EvaluationMetrics {
    let expected_norm: Vec<String> = expected.iter().map(|d| normalize_dialog(&d.text)).collect();
    let mut taken = vec![false; expected.len()];
    let mut matches = 0;

    for dialog in extracted {
        let ext_norm = normalize_dialog(&dialog.text);
        let hit = expected_norm
            .iter()
            .enumerate()
            .position(|(j, exp_norm)| !taken[j] && normalized_match(&ext_norm, exp_norm));

        if let Some(j) = hit {
            taken[j] = true;
            matches += 1;
            debug!(
                extracted = %dialog.text,
                expected = %expected[j].text,
                "Matched dialog"
            );
        }
    }

    EvaluationMetrics::from_counts(matches, extracted.len(), expected.len())
}

/// Normalized names present on only one side
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Differences {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl Differences {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Report expected names that were missed and extracted names that were not expected
pub fn log_differences<A, B>(extracted: &[A], expected: &[B], label: &str) -> Differences
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let extracted: BTreeSet<String> = name_set(extracted).into_iter().collect();
    let expected: BTreeSet<String> = name_set(expected).into_iter().collect();

    let diff = Differences {
        missing: expected.difference(&extracted).cloned().collect(),
        extra: extracted.difference(&expected).cloned().collect(),
    };

    if !diff.missing.is_empty() {
        warn!(label, missing = ?diff.missing, "Missing {}", label);
    }
    if !diff.extra.is_empty() {
        warn!(label, extra = ?diff.extra, "Extra {}", label);
    }

    diff
}
