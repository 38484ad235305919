//! Configuration structures for the analysis pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::FiscaiError;

/// CFOP codes for sales of goods acquired for resale, where the buyer is expected in person.
pub const DEFAULT_SENSITIVE_CFOPS: [&str; 4] = ["6101", "6102", "6108", "6116"];

/// Main configuration for the fiscai pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiscaiConfig {
    /// Classification rules.
    pub classification: ClassificationConfig,

    /// Batch report rendering.
    pub report: ReportConfig,

    /// Output formatting.
    pub output: OutputConfig,
}

/// Presence-rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// CFOP codes whose presence indicator must be the in-person code.
    pub sensitive_cfops: Vec<String>,

    /// `indPres` code required for sensitive CFOPs.
    pub in_person_code: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            sensitive_cfops: DEFAULT_SENSITIVE_CFOPS.iter().map(|c| c.to_string()).collect(),
            in_person_code: "1".to_string(),
        }
    }
}

/// Batch report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Documents listed per page.
    pub items_per_page: usize,

    /// Number of leading CFOP characters used when grouping counts.
    pub cfop_group_len: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            items_per_page: 10,
            cfop_group_len: 4,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Indent exported canonical JSON.
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty_json: true }
    }
}

impl FiscaiConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&std::path::Path>) -> crate::Result<Self> {
        match path {
            Some(path) => Self::from_file(path).map_err(|e| {
                FiscaiError::Config(format!("{}: {}", path.display(), e))
            }),
            None => Ok(Self::default()),
        }
    }

    /// Default config file location under the platform config directory.
    pub fn default_path(config_dir: Option<PathBuf>) -> PathBuf {
        config_dir
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fiscai")
            .join("config.json")
    }
}
