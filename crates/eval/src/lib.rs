pub mod benchmark;
pub mod config;
pub mod evaluator;
pub mod ground_truth;
pub mod history;
pub mod metrics;

pub use benchmark::{BenchmarkResult, Benchmarker, Extraction};
pub use config::{AnalysisMode, BenchmarkConfig};
pub use evaluator::{Differences, dialogs_match, evaluate_characters, evaluate_dialogs, log_differences};
pub use ground_truth::{Chapter, ExpectedData};
pub use history::{HistoryStore, HistorySummary};
pub use metrics::EvaluationMetrics;
