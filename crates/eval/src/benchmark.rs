use chrono::{DateTime, Utc};
use extract::{DialogAttribution, EntityMap};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use crate::config::{AnalysisMode, BenchmarkConfig};
use crate::evaluator::{evaluate_characters, evaluate_dialogs, log_differences};
use crate::ground_truth::ExpectedData;
use crate::metrics::EvaluationMetrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub timestamp: DateTime<Utc>,
    pub model_name: String,
    pub prompt_version: String,
    pub mode: AnalysisMode,
    pub character_metrics: EvaluationMetrics,
    pub dialog_metrics: EvaluationMetrics,
    pub extracted_characters: Vec<String>,
    pub expected_characters: Vec<String>,
    pub extracted_dialogs: Vec<DialogAttribution>,
    pub expected_dialogs: Vec<DialogAttribution>,
    pub timing_ms: BTreeMap<String, f64>,
    /// SHA-256 of the raw responses, identifies runs over identical model output
    pub responses_digest: String,
}

impl BenchmarkResult {
    pub fn meets_target(&self, target_f1: f64) -> bool {
        self.character_metrics.f1 >= target_f1 && self.dialog_metrics.f1 >= target_f1
    }
}

/// Characters and dialogs pulled out of a run's raw responses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub characters: Vec<String>,
    pub dialogs: Vec<DialogAttribution>,
}

/// One batched response per text segment, merged across segments
pub fn extract_batched(responses: &[String]) -> Extraction {
    let mut entities = EntityMap::new();
    for (segment, response) in responses.iter().enumerate() {
        let parsed = extract::parse_entities(response);
        info!(segment, characters = parsed.len(), "Parsed batched response");
        entities.merge(parsed);
    }

    Extraction {
        characters: entities.names(),
        dialogs: entities.dialogs(),
    }
}

/// First response lists characters, the rest list dialogs
pub fn extract_two_pass(responses: &[String]) -> Extraction {
    let Some((first, rest)) = responses.split_first() else {
        return Extraction::default();
    };

    let characters = extract::parse_character_list(first);
    info!(characters = characters.len(), "Parsed character list");

    let dialogs: Vec<DialogAttribution> = rest
        .iter()
        .flat_map(|r| extract::parse_dialog_list(r))
        .collect();
    info!(dialogs = dialogs.len(), "Parsed dialog lists");

    Extraction { characters, dialogs }
}

pub fn digest_responses(responses: &[String]) -> String {
    let mut hasher = Sha256::new();
    for response in responses {
        hasher.update(response.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

pub struct Benchmarker {
    config: BenchmarkConfig,
    expected: ExpectedData,
}

impl Benchmarker {
    pub fn new(config: BenchmarkConfig, expected: ExpectedData) -> Self {
        Self { config, expected }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Parse the raw responses of one run and score them against the ground truth
    pub fn run(&self, responses: &[String]) -> BenchmarkResult {
        let mut timing_ms = BTreeMap::new();

        let start = Instant::now();
        let extraction = match self.config.mode {
            AnalysisMode::Batched => extract_batched(responses),
            AnalysisMode::TwoPass => extract_two_pass(responses),
        };
        timing_ms.insert("parse".to_string(), elapsed_ms(start));

        let start = Instant::now();
        let expected_dialogs = self.expected.all_dialogs();
        let character_metrics =
            evaluate_characters(&extraction.characters, &self.expected.characters);
        let dialog_metrics = evaluate_dialogs(&extraction.dialogs, &expected_dialogs);
        timing_ms.insert("evaluate".to_string(), elapsed_ms(start));

        info!(metrics = %character_metrics, "Characters");
        log_differences(&extraction.characters, &self.expected.characters, "characters");
        info!(
            metrics = %dialog_metrics,
            extracted = extraction.dialogs.len(),
            expected = expected_dialogs.len(),
            "Dialogs"
        );

        BenchmarkResult {
            timestamp: Utc::now(),
            model_name: self.config.model_name.clone(),
            prompt_version: self.config.prompt_version.clone(),
            mode: self.config.mode,
            character_metrics,
            dialog_metrics,
            extracted_characters: extraction.characters,
            expected_characters: self.expected.characters.clone(),
            extracted_dialogs: extraction.dialogs,
            expected_dialogs,
            timing_ms,
            responses_digest: digest_responses(responses),
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
