//! Persisted model artifacts
//!
//! A training run writes three independently serialized blobs (scaler, OOD
//! detector, regressor) and a manifest holding their SHA-256 checksums.
//! Every file goes to a temporary path first and is renamed into place.

use crate::anomaly::IsolationForest;
use crate::error::{PipelineError, Result};
use crate::features::FeatureSchema;
use crate::ml::{GradientBoostingRegressor, RegressionMetrics, StandardScaler};
use crate::models::MODEL_VERSION;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SCALER_FILE: &str = "scaler.json";
pub const OOD_DETECTOR_FILE: &str = "ood_detector.json";
pub const REGRESSOR_FILE: &str = "co_predictor_model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Checksum entry for one blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub file: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Description of a saved bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub model_version: String,
    pub created_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub artifacts: Vec<ArtifactEntry>,
    /// Held-out evaluation of the regressor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RegressionMetrics>,
}

impl Manifest {
    pub fn entry(&self, file: &str) -> Option<&ArtifactEntry> {
        self.artifacts.iter().find(|a| a.file == file)
    }
}

/// The three fitted components produced by one training run
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub scaler: StandardScaler,
    pub ood_detector: IsolationForest,
    pub regressor: GradientBoostingRegressor,
}

impl ArtifactBundle {
    /// Feature schema implied by the scaler's feature names
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.scaler.feature_names().iter().cloned())
    }

    /// Check each component and that all of them agree on the schema width
    pub fn validate(&self) -> Result<FeatureSchema> {
        self.scaler.validate()?;
        self.ood_detector.validate()?;
        self.regressor.validate()?;

        let schema = self.schema();
        if schema.is_empty() {
            return Err(PipelineError::InvalidArtifact {
                name: SCALER_FILE.to_string(),
                reason: "no feature names".to_string(),
            });
        }
        schema.check_width("scaler", self.scaler.n_features())?;
        schema.check_width("OOD detector", self.ood_detector.n_features())?;
        schema.check_width("regressor", self.regressor.n_features())?;
        Ok(schema)
    }

    /// Write all blobs and the manifest into `dir`
    pub fn save(
        &self,
        dir: impl AsRef<Path>,
        metrics: Option<RegressionMetrics>,
    ) -> Result<Manifest> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let artifacts = vec![
            write_blob(dir, SCALER_FILE, &self.scaler)?,
            write_blob(dir, OOD_DETECTOR_FILE, &self.ood_detector)?,
            write_blob(dir, REGRESSOR_FILE, &self.regressor)?,
        ];
        let manifest = Manifest {
            model_version: MODEL_VERSION.to_string(),
            created_at: Utc::now(),
            feature_names: self.scaler.feature_names().to_vec(),
            artifacts,
            metrics,
        };
        write_atomic(&dir.join(MANIFEST_FILE), &serde_json::to_vec_pretty(&manifest)?)?;

        info!(
            dir = %dir.display(),
            n_features = manifest.feature_names.len(),
            "Model artifacts saved"
        );
        Ok(manifest)
    }

    /// Read and validate a bundle from `dir`
    ///
    /// Missing blobs yield `AssetsNotLoaded`. When a manifest is present
    /// every blob must match its recorded checksum.
    pub fn load(dir: impl AsRef<Path>) -> Result<(Self, Option<Manifest>)> {
        let dir = dir.as_ref();
        let manifest = read_manifest(dir)?;

        let bundle = Self {
            scaler: read_blob(dir, SCALER_FILE, manifest.as_ref())?,
            ood_detector: read_blob(dir, OOD_DETECTOR_FILE, manifest.as_ref())?,
            regressor: read_blob(dir, REGRESSOR_FILE, manifest.as_ref())?,
        };
        let schema = bundle.validate()?;

        if let Some(m) = &manifest {
            let names = schema.names();
            if m.feature_names.iter().map(String::as_str).ne(names.iter().copied()) {
                return Err(PipelineError::InvalidArtifact {
                    name: MANIFEST_FILE.to_string(),
                    reason: "feature names disagree with the scaler".to_string(),
                });
            }
        }
        Ok((bundle, manifest))
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Write to a sibling temp file, sync, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn write_blob<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<ArtifactEntry> {
    let bytes = serde_json::to_vec(value)?;
    write_atomic(&dir.join(file), &bytes)?;
    debug!(file = %file, size_bytes = bytes.len(), "Artifact written");
    Ok(ArtifactEntry {
        file: file.to_string(),
        sha256: compute_checksum(&bytes),
        size_bytes: bytes.len(),
    })
}

fn read_bytes(path: PathBuf) -> Result<Vec<u8>> {
    fs::read(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            PipelineError::AssetsNotLoaded(format!("{} not found", path.display()))
        }
        _ => PipelineError::Io(e),
    })
}

fn read_manifest(dir: &Path) -> Result<Option<Manifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        warn!(dir = %dir.display(), "No manifest found, skipping checksum verification");
        return Ok(None);
    }
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PipelineError::InvalidArtifact {
            name: MANIFEST_FILE.to_string(),
            reason: e.to_string(),
        })
}

fn read_blob<T: DeserializeOwned>(
    dir: &Path,
    file: &str,
    manifest: Option<&Manifest>,
) -> Result<T> {
    let bytes = read_bytes(dir.join(file))?;

    if let Some(m) = manifest {
        let entry = m.entry(file).ok_or_else(|| PipelineError::InvalidArtifact {
            name: file.to_string(),
            reason: "not listed in manifest".to_string(),
        })?;
        let actual = compute_checksum(&bytes);
        if actual != entry.sha256 {
            return Err(PipelineError::InvalidArtifact {
                name: file.to_string(),
                reason: format!("checksum mismatch: expected {}, got {}", entry.sha256, actual),
            });
        }
    }

    serde_json::from_slice(&bytes).map_err(|e| PipelineError::InvalidArtifact {
        name: file.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::anomaly::IsolationForestConfig;
    use crate::ml::BoostingConfig;
    use ndarray::{array, Array1, Array2};
    use tempfile::TempDir;

    /// Small bundle over three named features
    pub(crate) fn tiny_bundle() -> ArtifactBundle {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let x = Array2::from_shape_fn((60, 3), |(i, j)| match j {
            0 => i as f64,
            1 => (i % 7) as f64,
            _ => ((i * 13) % 5) as f64,
        });
        let y: Array1<f64> = x.rows().into_iter().map(|r| r[0] * 0.5 + r[1]).collect();
        let scaler = StandardScaler::fit(names, x.view()).unwrap();
        let scaled = scaler.transform(x.view()).unwrap();
        let ood_detector = IsolationForest::fit(
            scaled.view(),
            &IsolationForestConfig {
                n_estimators: 20,
                ..Default::default()
            },
        )
        .unwrap();
        let regressor = GradientBoostingRegressor::fit(
            scaled.view(),
            y.view(),
            &BoostingConfig {
                n_estimators: 10,
                ..Default::default()
            },
        )
        .unwrap();
        ArtifactBundle {
            scaler,
            ood_detector,
            regressor,
        }
    }

    #[test]
    fn test_compute_checksum() {
        assert_eq!(
            compute_checksum(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let bundle = tiny_bundle();
        let metrics = RegressionMetrics {
            r2: 0.9,
            mae: 0.1,
            rmse: 0.2,
            n_samples: 12,
        };
        let manifest = bundle.save(dir.path(), Some(metrics)).unwrap();
        assert_eq!(manifest.artifacts.len(), 3);
        assert_eq!(manifest.model_version, MODEL_VERSION);
        for file in [SCALER_FILE, OOD_DETECTOR_FILE, REGRESSOR_FILE, MANIFEST_FILE] {
            assert!(dir.path().join(file).exists(), "{} missing", file);
        }
        assert!(!dir.path().join("scaler.tmp").exists());

        let (loaded, loaded_manifest) = ArtifactBundle::load(dir.path()).unwrap();
        assert_eq!(loaded.scaler, bundle.scaler);
        assert_eq!(loaded.ood_detector, bundle.ood_detector);
        assert_eq!(loaded.regressor, bundle.regressor);
        assert_eq!(loaded_manifest, Some(manifest));
    }

    #[test]
    fn test_missing_blob_is_assets_not_loaded() {
        let dir = TempDir::new().unwrap();
        tiny_bundle().save(dir.path(), None).unwrap();
        fs::remove_file(dir.path().join(REGRESSOR_FILE)).unwrap();
        assert!(matches!(
            ArtifactBundle::load(dir.path()),
            Err(PipelineError::AssetsNotLoaded(_))
        ));
    }

    #[test]
    fn test_tampered_blob_fails_checksum() {
        let dir = TempDir::new().unwrap();
        tiny_bundle().save(dir.path(), None).unwrap();
        let path = dir.path().join(SCALER_FILE);
        let mut text = fs::read_to_string(&path).unwrap();
        text.push(' ');
        fs::write(&path, text).unwrap();

        match ArtifactBundle::load(dir.path()) {
            Err(PipelineError::InvalidArtifact { name, reason }) => {
                assert_eq!(name, SCALER_FILE);
                assert!(reason.contains("checksum mismatch"));
            }
            other => panic!("expected checksum failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_without_manifest() {
        let dir = TempDir::new().unwrap();
        tiny_bundle().save(dir.path(), None).unwrap();
        fs::remove_file(dir.path().join(MANIFEST_FILE)).unwrap();
        let (_, manifest) = ArtifactBundle::load(dir.path()).unwrap();
        assert!(manifest.is_none());
    }

    #[test]
    fn test_width_disagreement_is_rejected() {
        let mut bundle = tiny_bundle();
        let other = StandardScaler::fit(
            vec!["a".to_string(), "b".to_string()],
            array![[1.0, 2.0], [2.0, 3.0]].view(),
        )
        .unwrap();
        bundle.scaler = other;
        assert!(matches!(
            bundle.validate(),
            Err(PipelineError::FeatureAlignment(_))
        ));
    }
}
