//! Synthetic air-quality data
//!
//! Generates hourly readings shaped like the UCI AirQuality export: a shared
//! traffic factor with a diurnal cycle drives the pollutant channels, a
//! seasonal cycle drives temperature and humidity, and a configurable share
//! of cells is replaced by the missing-value sentinel.

use crate::error::Result;
use crate::models::{Reading, SensorField, MISSING_SENTINEL};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::Path;

/// Generator settings
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub start: NaiveDateTime,
    pub days: u32,
    pub step_hours: u32,
    pub seed: u64,
    /// Probability that a single cell is written as the sentinel
    pub missing_rate: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2004, 3, 10)
            .and_then(|d| d.and_hms_opt(18, 0, 0))
            .unwrap_or_default();
        Self {
            start,
            days: 365,
            step_hours: 1,
            seed: 42,
            missing_rate: 0.0,
        }
    }
}

/// Typical level of each channel and its sensitivity to traffic
fn channel_profile(field: SensorField) -> (f64, f64) {
    match field {
        SensorField::CoGt => (2.2, 1.4),
        SensorField::Pt08S1Co => (1360.0, 0.5),
        SensorField::NmhcGt => (150.0, 1.0),
        SensorField::C6h6Gt => (11.9, 1.2),
        SensorField::Pt08S2Nmhc => (1046.0, 0.6),
        SensorField::NoxGt => (166.0, 1.1),
        SensorField::Pt08S3Nox => (1056.0, -0.5),
        SensorField::No2Gt => (113.0, 0.7),
        SensorField::Pt08S4No2 => (1692.0, 0.3),
        SensorField::Pt08S5O3 => (1268.0, 0.8),
        SensorField::Temperature => (13.6, 0.0),
        SensorField::RelativeHumidity => (48.9, 0.0),
        SensorField::AbsoluteHumidity => (0.7578, 0.0),
    }
}

/// Standard normal sample via Box-Muller
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Generate readings for every step in the configured period
pub fn generate_readings(config: &SyntheticConfig) -> Vec<Reading> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let step = config.step_hours.max(1);
    let count = (config.days as usize * 24) / step as usize;

    (0..count)
        .map(|i| {
            let ts = config.start + Duration::hours((i * step as usize) as i64);
            let hour = ts.hour() as f64;
            let day_of_year = ts.ordinal() as f64;

            // Peaks at 18:00 with value 1, the documented example hour
            let diurnal = 1.0 + 0.25 * (2.0 * PI * (hour - 18.0) / 24.0).cos() - 0.25;
            let traffic = (diurnal * (1.0 + 0.12 * gaussian(&mut rng))).max(0.2);
            let season = (2.0 * PI * (day_of_year - 293.0) / 365.0).sin();

            let temperature = 13.6 + 8.0 * season + 1.5 * gaussian(&mut rng);
            let humidity = (48.9 - 0.8 * (temperature - 13.6) + 4.0 * gaussian(&mut rng))
                .clamp(5.0, 95.0);
            let absolute = (0.7578 * (1.0 + 0.04 * (temperature - 13.6))
                + 0.05 * gaussian(&mut rng))
            .max(0.1);

            let mut reading = Reading::new(ts);
            for field in SensorField::ALL {
                let value = match field {
                    SensorField::Temperature => temperature,
                    SensorField::RelativeHumidity => humidity,
                    SensorField::AbsoluteHumidity => absolute,
                    _ => {
                        let (level, sensitivity) = channel_profile(field);
                        level * traffic.powf(sensitivity) * (1.0 + 0.05 * gaussian(&mut rng))
                    }
                };
                let value = if rng.gen_bool(config.missing_rate.clamp(0.0, 1.0)) {
                    MISSING_SENTINEL
                } else {
                    (value * 1e4).round() / 1e4
                };
                reading.set(field.column_name(), value);
            }
            reading
        })
        .collect()
}

/// Write readings in the UCI layout: `;` separated, `,` decimal mark,
/// `dd/mm/yyyy` date and `HH.MM.SS` time columns
pub fn write_uci_csv(path: impl AsRef<Path>, readings: &[Reading]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path.as_ref())?;

    let mut header = vec!["Date".to_string(), "Time".to_string()];
    header.extend(SensorField::ALL.iter().map(|f| f.column_name().to_string()));
    writer.write_record(&header)?;

    for reading in readings {
        let mut record = vec![
            reading.timestamp.format("%d/%m/%Y").to_string(),
            reading.timestamp.format("%H.%M.%S").to_string(),
        ];
        record.extend(SensorField::ALL.iter().map(|f| {
            reading
                .get(f.column_name())
                .map(|v| v.to_string().replace('.', ","))
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
