//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_MODELS_DIR: &str = "models";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Directory holding trained artifacts
    pub models_dir: Option<PathBuf>,
    /// Default output format
    pub default_format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from the user's config file, if any
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Command line wins over the file, the file over built-in defaults
    pub fn api_url(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn models_dir(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.models_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR))
    }

    pub fn format(&self, cli: Option<OutputFormat>) -> OutputFormat {
        cli.or(self.default_format).unwrap_or_default()
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("aqp").join("config.json"))
    }
}
