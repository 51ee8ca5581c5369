//! Classifier model configuration

use complyscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classifier::DEFAULT_TOP_K;

/// Settings for the category classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Model name, used in logs and metrics
    pub name: String,

    /// Model source (where to load from)
    pub source: ModelSource,

    /// Device to run on (cpu, cuda, metal)
    pub device: String,

    /// Maximum sequence length in tokens
    pub max_length: usize,

    /// Number of categories returned per input
    pub top_k: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            name: "bert-base-chinese".to_string(),
            source: ModelSource::HuggingFace {
                repo: "bert-base-chinese".to_string(),
                revision: default_revision(),
            },
            device: default_device(),
            max_length: default_max_length(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl ClassifierSettings {
    /// Load settings from a local model directory
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::Local { path: path.into() },
            ..Default::default()
        }
    }

    /// Set the number of returned categories
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Check the settings against the label set they will be used with
    pub fn validate(&self, num_labels: usize) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::config("classifier top_k must be at least 1"));
        }
        if num_labels < self.top_k {
            return Err(Error::config(format!(
                "label set has {} categories, fewer than top_k={}",
                num_labels, self.top_k
            )));
        }
        if self.max_length == 0 {
            return Err(Error::config("classifier max_length must be at least 1"));
        }
        Ok(())
    }
}

/// Model source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from a local directory holding config.json, tokenizer and weights
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}
