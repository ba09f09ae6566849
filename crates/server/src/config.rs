//! Server configuration

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::path::PathBuf;

/// How prediction failures map to HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorStatusMode {
    /// 503 for missing assets, 422 for bad input, 500 otherwise
    #[default]
    Http,
    /// Every error body is sent with 200
    AlwaysOk,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen port for the prediction API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the trained artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default)]
    pub error_status: ErrorStatusMode,
}

fn default_api_port() -> u16 {
    8000
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

impl ServerConfig {
    /// Load from an optional `aq-server` config file and `AQ_*` variables
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("aq-server").required(false))
            .add_source(config::Environment::with_prefix("AQ").try_parsing(true));
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()?
            .try_deserialize()
            .context("invalid server configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ServerConfig::from_builder(config::Config::builder()).unwrap();
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.error_status, ErrorStatusMode::Http);
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("api_port", 9100)
            .unwrap()
            .set_override("models_dir", "/srv/aq/models")
            .unwrap()
            .set_override("error_status", "always-ok")
            .unwrap();
        let config = ServerConfig::from_builder(builder).unwrap();
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.models_dir, PathBuf::from("/srv/aq/models"));
        assert_eq!(config.error_status, ErrorStatusMode::AlwaysOk);
    }

    #[test]
    fn test_invalid_value_fails_instead_of_resetting() {
        let builder = config::Config::builder()
            .set_override("models_dir", "/srv/aq/models")
            .unwrap()
            .set_override("error_status", "always_ok")
            .unwrap();
        let err = ServerConfig::from_builder(builder).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid server configuration"));

        let builder = config::Config::builder()
            .set_override("api_port", "eighty")
            .unwrap();
        assert!(ServerConfig::from_builder(builder).is_err());
    }
}
