//! End-to-end pipeline tests: synthetic data, training, loading, prediction

use aq_lib::data::{generate_readings, write_uci_csv, SyntheticConfig};
use aq_lib::ml::BoostingConfig;
use aq_lib::training::{Trainer, TrainingConfig};
use aq_lib::{PredictionRequest, PredictionService, Predictor};
use tempfile::TempDir;

/// Train on a year of synthetic readings every five hours
fn trained_service(dir: &TempDir) -> PredictionService {
    let data_path = dir.path().join("AirQualityUCI.csv");
    let readings = generate_readings(&SyntheticConfig {
        days: 365,
        step_hours: 5,
        ..Default::default()
    });
    write_uci_csv(&data_path, &readings).unwrap();

    let mut config = TrainingConfig::new(&data_path, dir.path().join("models"));
    config.boosting = BoostingConfig {
        n_estimators: 60,
        ..Default::default()
    };
    let (report, _) = Trainer::new(config).run().unwrap();
    assert!(report.metrics.r2 > 0.7, "r2 was {}", report.metrics.r2);

    PredictionService::load(dir.path().join("models"))
}

fn extreme_request() -> PredictionRequest {
    PredictionRequest {
        date_time: "2025-10-20T18:00:00".to_string(),
        pt08_s1_co: 50000.0,
        nmhc_gt: 10000.0,
        c6h6_gt: 500.0,
        pt08_s2_nmhc: 50000.0,
        nox_gt: 5000.0,
        pt08_s3_nox: 50000.0,
        no2_gt: 5000.0,
        pt08_s4_no2: 50000.0,
        pt08_s5_o3: 50000.0,
        t: 100.0,
        rh: 200.0,
        ah: 50.0,
    }
}

#[test]
fn test_trained_service_separates_typical_and_extreme_inputs() {
    let dir = TempDir::new().unwrap();
    let service = trained_service(&dir);
    assert!(service.is_ready(), "{:?}", service.degraded_reason());
    assert_eq!(service.schema().unwrap().len(), 21);

    let typical = service.predict_request(&PredictionRequest::example()).unwrap();
    assert!(typical.prediction_co_gt.is_finite());
    assert!(!typical.is_out_of_distribution);
    assert_eq!(typical.model_version, "1.0.0");
    // rounded to four decimals
    let scaled = typical.prediction_co_gt * 1e4;
    assert!((scaled - scaled.round()).abs() < 1e-6);

    assert!(service.predict_request(&extreme_request()).unwrap().is_out_of_distribution);
    assert!(
        service
            .predict_request(&PredictionRequest::example().scaled(100.0))
            .unwrap()
            .is_out_of_distribution
    );

    // identical input, identical output
    let again = service.predict_request(&PredictionRequest::example()).unwrap();
    assert_eq!(typical, again);

    // fields named like derived features are recomputed from the timestamp
    let mut colliding = PredictionRequest::example().to_reading().unwrap();
    colliding.set("Day", 3.0);
    colliding.set("NOx_NO2", 0.0);
    assert_eq!(service.predict(&colliding).unwrap(), typical);
}

#[test]
fn test_retrain_with_same_seed_gives_same_predictions() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let first = trained_service(&a)
        .predict_request(&PredictionRequest::example())
        .unwrap();
    let second = trained_service(&b)
        .predict_request(&PredictionRequest::example())
        .unwrap();
    assert_eq!(first, second);
}
