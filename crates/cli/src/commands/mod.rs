//! Subcommand implementations

pub mod data;
pub mod predict;
pub mod remote;
pub mod train;

use anyhow::{Context, Result};
use aq_lib::PredictionRequest;
use std::io::Read;

/// Resolve `--input`: `example`, `-` for stdin, inline JSON or a file path
pub fn read_request(input: &str) -> Result<PredictionRequest> {
    let text = match input.trim() {
        "example" => return Ok(PredictionRequest::example()),
        "-" => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read request from stdin")?;
            buffer
        }
        inline if inline.starts_with('{') => inline.to_string(),
        path => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file '{}'", path))?,
    };
    serde_json::from_str(&text).context("Request is not a valid prediction payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_example_keyword() {
        assert_eq!(read_request("example").unwrap(), PredictionRequest::example());
    }

    #[test]
    fn test_inline_json() {
        let json = serde_json::to_string(&PredictionRequest::example()).unwrap();
        assert_eq!(read_request(&json).unwrap(), PredictionRequest::example());
    }

    #[test]
    fn test_request_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, serde_json::to_vec(&PredictionRequest::example()).unwrap()).unwrap();
        let request = read_request(path.to_str().unwrap()).unwrap();
        assert_eq!(request.nox_gt, 166.0);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = read_request(r#"{"DateTime": "2025-10-20T18:00:00"}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("missing field"));
    }

    #[test]
    fn test_missing_file_is_rejected() {
        assert!(read_request("/nonexistent/request.json").is_err());
    }
}
