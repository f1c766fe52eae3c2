use anyhow::{Context, Result};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::benchmark::BenchmarkResult;

/// Append-only record of benchmark runs, kept as one JSON array on disk
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previous runs, oldest first. A missing file is an empty history.
    pub async fn load(&self) -> Result<Vec<BenchmarkResult>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Corrupt benchmark history: {}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read benchmark history: {}", self.path.display())),
        }
    }

    /// Add a run and rewrite the file. Returns the number of stored runs.
    pub async fn append(&self, result: &BenchmarkResult) -> Result<usize> {
        let mut history = self.load().await?;
        history.push(result.clone());

        let json = serde_json::to_string_pretty(&history)?;
        fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write benchmark history: {}", self.path.display()))?;

        info!(runs = history.len(), path = %self.path.display(), "Saved benchmark run");
        Ok(history.len())
    }

    pub async fn summary(&self) -> Result<HistorySummary> {
        Ok(HistorySummary::from_results(&self.load().await?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub runs: usize,
    pub character_f1_mean: f64,
    pub character_f1_stdev: f64,
    pub dialog_f1_mean: f64,
    pub dialog_f1_stdev: f64,
}

impl HistorySummary {
    pub fn from_results(results: &[BenchmarkResult]) -> Self {
        let character: Vec<f64> = results.iter().map(|r| r.character_metrics.f1).collect();
        let dialog: Vec<f64> = results.iter().map(|r| r.dialog_metrics.f1).collect();

        Self {
            runs: results.len(),
            character_f1_mean: mean(&character),
            character_f1_stdev: stdev(&character),
            dialog_f1_mean: mean(&dialog),
            dialog_f1_stdev: stdev(&dialog),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        statistical::mean(values)
    }
}

// Sample deviation needs two points
fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        statistical::standard_deviation(values, None)
    }
}
