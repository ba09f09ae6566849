//! CLI integration tests

use std::process::{Command, Output};
use tempfile::TempDir;

fn aqp(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "aq-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = aqp(&["--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Air Quality CO Predictor"),
        "Should show app name"
    );
    for command in ["train", "predict", "query", "status", "generate-data"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = aqp(&["--version"]);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout(&output).contains("aqp"), "Should show binary name");
}

#[test]
fn test_train_help() {
    let output = aqp(&["train", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Train help should succeed");
    for option in ["--data", "--models-dir", "--seed", "--outlier-scope", "--delimiter"] {
        assert!(stdout.contains(option), "Should show {} option", option);
    }
}

#[test]
fn test_generate_data_help() {
    let output = aqp(&["generate-data", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Generate-data help should succeed");
    assert!(stdout.contains("--days"), "Should show days option");
    assert!(stdout.contains("--step-hours"), "Should show step-hours option");
}

#[test]
fn test_format_option() {
    let output = aqp(&["--format", "yaml", "status"]);

    assert!(!output.status.success(), "Unknown format should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("table") && stderr.contains("json"));
}

#[test]
fn test_invalid_outlier_scope() {
    let output = aqp(&["train", "--data", "x.csv", "--outlier-scope", "everything"]);

    assert!(!output.status.success(), "Unknown outlier scope should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("training-partition"));
}

#[test]
fn test_invalid_command() {
    let output = aqp(&["forecast"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_missing_argument() {
    let output = aqp(&["predict"]);
    assert!(!output.status.success(), "Missing --input should fail");
}

#[test]
fn test_train_missing_data_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.csv");
    let output = aqp(&["train", "--data", missing.to_str().unwrap()]);

    assert!(!output.status.success(), "Training without data should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Data file not found"));
}

#[test]
fn test_predict_without_artifacts() {
    let dir = TempDir::new().unwrap();
    let output = aqp(&[
        "predict",
        "--input",
        "example",
        "--models-dir",
        dir.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Please run the training pipeline"));
}

/// Generate data, train on it and score the documented payload
#[test]
fn test_generate_train_predict() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("air.csv");
    let models = dir.path().join("models");
    let data = data.to_str().unwrap();
    let models = models.to_str().unwrap();

    let output = aqp(&["generate-data", "--output", data, "--step-hours", "12"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = aqp(&["--format", "json", "train", "--data", data, "--models-dir", models]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let trained: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(trained["manifest"]["model_version"], "1.0.0");
    assert_eq!(trained["report"]["feature_names"].as_array().unwrap().len(), 21);

    let output = aqp(&[
        "--format",
        "json",
        "predict",
        "--input",
        "example",
        "--models-dir",
        models,
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(result["prediction_co_gt"].as_f64().unwrap().is_finite());
    assert_eq!(result["model_version"], "1.0.0");
}
