use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision/recall/F1 for one extracted-vs-expected comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    /// Build metrics from match counts. Empty sides score 0.0, never NaN.
    pub fn from_counts(true_positives: usize, extracted: usize, expected: usize) -> Self {
        let precision = ratio(true_positives, extracted);
        let recall = ratio(true_positives, expected);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            precision,
            recall,
            f1,
            true_positives,
            false_positives: extracted.saturating_sub(true_positives),
            false_negatives: expected.saturating_sub(true_positives),
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P={:.2}%, R={:.2}%, F1={:.2}%",
            self.precision * 100.0,
            self.recall * 100.0,
            self.f1 * 100.0
        )
    }
}
