//! Offline training command

use anyhow::{Context, Result};
use aq_lib::artifacts::Manifest;
use aq_lib::training::{OutlierScope, Trainer, TrainingConfig, TrainingReport};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{
    color_r2, format_bytes, format_metric, print_heading, print_json, print_success,
    print_table, print_warning, Field, OutputFormat,
};

/// Arguments of `aqp train`
#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub data: PathBuf,
    pub models_dir: PathBuf,
    pub seed: u64,
    pub outlier_scope: OutlierScope,
    pub delimiter: char,
}

impl TrainArgs {
    pub fn into_config(self) -> Result<TrainingConfig> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| {
                format!(
                    "Delimiter '{}' is not a single ASCII character",
                    self.delimiter
                )
            })?;

        let mut config = TrainingConfig::new(self.data, self.models_dir).with_seed(self.seed);
        config.outlier_scope = self.outlier_scope;
        config.loader.delimiter = delimiter;
        Ok(config)
    }
}

#[derive(Serialize)]
struct TrainOutput<'a> {
    report: &'a TrainingReport,
    manifest: &'a Manifest,
}

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "SHA-256")]
    sha256: String,
}

/// Train the scaler, OOD detector and regressor and persist them
pub fn run_training(args: TrainArgs, format: OutputFormat) -> Result<()> {
    let config = args.into_config()?;
    let trainer = Trainer::new(config);
    let (report, manifest) = trainer.run().with_context(|| {
        format!(
            "Training failed for '{}'",
            trainer.config().data_path.display()
        )
    })?;

    match format {
        OutputFormat::Json => print_json(&TrainOutput {
            report: &report,
            manifest: &manifest,
        })?,
        OutputFormat::Table => print_report(&report, &manifest),
    }
    Ok(())
}

fn print_report(report: &TrainingReport, manifest: &Manifest) {
    print_heading("Training Summary");
    let mut fields = Vec::new();
    if let Some(load) = &report.load {
        fields.push(Field::new("Rows read", load.rows_read));
        fields.push(Field::new("Malformed rows skipped", load.rows_skipped));
        fields.push(Field::new("Rows without target", load.rows_missing_required));
        fields.push(Field::new("Values imputed", load.values_imputed));
    }
    fields.push(Field::new("Rows available", report.rows_available));
    fields.push(Field::new(
        "Outliers removed",
        format!("{} ({})", report.outliers_removed, report.outlier_scope),
    ));
    fields.push(Field::new("Training rows", report.train_rows));
    fields.push(Field::new("Test rows", report.test_rows));
    fields.push(Field::new("Features", report.feature_names.len()));
    fields.push(Field::new("R²", color_r2(report.metrics.r2)));
    fields.push(Field::new("MAE", format_metric(report.metrics.mae)));
    fields.push(Field::new("RMSE", format_metric(report.metrics.rmse)));
    fields.push(Field::new("Duration", format!("{:.1}s", report.duration_secs)));
    print_table(fields);

    println!();
    let rows = manifest
        .artifacts
        .iter()
        .map(|a| ArtifactRow {
            file: a.file.clone(),
            size: format_bytes(a.size_bytes as u64),
            sha256: a.sha256.chars().take(12).collect(),
        })
        .collect();
    print_table(rows);

    if report.metrics.r2 < 0.5 {
        print_warning("Hold-out R² is low; check the input data");
    }
    if let Some(dir) = &report.models_dir {
        print_success(&format!(
            "Model {} saved to {}",
            manifest.model_version,
            dir.display()
        ));
    }
}
