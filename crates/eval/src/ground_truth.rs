use anyhow::{Context, Result};
use extract::DialogAttribution;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Hand-labeled reference for one book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedData {
    pub characters: Vec<String>,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub dialogs: Vec<DialogAttribution>,
}

impl ExpectedData {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Malformed ground truth")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read ground truth: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to load ground truth: {}", path.display()))
    }

    /// Dialogs of every chapter, in chapter order
    pub fn all_dialogs(&self) -> Vec<DialogAttribution> {
        self.chapters
            .iter()
            .flat_map(|c| c.dialogs.iter().cloned())
            .collect()
    }
}
