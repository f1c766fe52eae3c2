use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub mode: AnalysisMode,
    pub model_name: String,
    pub prompt_version: String,
    /// F1 both characters and dialogs must reach for a run to pass
    pub target_f1: f64,
    pub history_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Batched,  // One response per segment with characters, dialogs, traits and voice
    TwoPass,  // Character list response followed by dialog list responses
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Batched,
            model_name: "unknown".to_string(),
            prompt_version: "v5.0".to_string(),
            target_f1: 0.9,
            history_path: PathBuf::from("benchmark_history.json"),
        }
    }
}

impl BenchmarkConfig {
    pub fn batched() -> Self {
        Self::default()
    }

    pub fn two_pass() -> Self {
        Self {
            mode: AnalysisMode::TwoPass,
            ..Self::default()
        }
    }

    /// Read config from a JSON file. A missing file means defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Invalid benchmark config: {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read benchmark config: {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: BenchmarkConfig =
            serde_json::from_str(r#"{"mode": "two_pass", "model_name": "qwen2.5-1.5b"}"#).unwrap();

        assert_eq!(config.mode, AnalysisMode::TwoPass);
        assert_eq!(config.model_name, "qwen2.5-1.5b");
        assert_eq!(config.target_f1, 0.9);
        assert_eq!(config.history_path, PathBuf::from("benchmark_history.json"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(serde_json::from_str::<BenchmarkConfig>(r#"{"mode": "five_pass"}"#).is_err());
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("benchmark-config-does-not-exist.json");
        let config = BenchmarkConfig::load(&path).await.unwrap();

        assert_eq!(config.mode, AnalysisMode::Batched);
    }

    #[tokio::test]
    async fn test_malformed_file_is_error() {
        let path = std::env::temp_dir().join(format!("benchmark-config-{}.json", std::process::id()));
        tokio::fs::write(&path, "{ mode: ").await.unwrap();

        let result = BenchmarkConfig::load(&path).await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(result.is_err());
    }
}
