//! Core data models for the CO predictor

use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Version string reported with every prediction
pub const MODEL_VERSION: &str = "1.0.0";

/// Regression target column
pub const TARGET_COLUMN: &str = "CO(GT)";

/// Reserved value marking a missing measurement in the raw dataset
pub const MISSING_SENTINEL: f64 = -200.0;

/// Known measurement columns of the air-quality dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorField {
    CoGt,
    Pt08S1Co,
    NmhcGt,
    C6h6Gt,
    Pt08S2Nmhc,
    NoxGt,
    Pt08S3Nox,
    No2Gt,
    Pt08S4No2,
    Pt08S5O3,
    Temperature,
    RelativeHumidity,
    AbsoluteHumidity,
}

impl SensorField {
    /// All columns in dataset order
    pub const ALL: [SensorField; 13] = [
        SensorField::CoGt,
        SensorField::Pt08S1Co,
        SensorField::NmhcGt,
        SensorField::C6h6Gt,
        SensorField::Pt08S2Nmhc,
        SensorField::NoxGt,
        SensorField::Pt08S3Nox,
        SensorField::No2Gt,
        SensorField::Pt08S4No2,
        SensorField::Pt08S5O3,
        SensorField::Temperature,
        SensorField::RelativeHumidity,
        SensorField::AbsoluteHumidity,
    ];

    /// Columns accepted as model inputs (everything but the target)
    pub const INPUTS: [SensorField; 12] = [
        SensorField::Pt08S1Co,
        SensorField::NmhcGt,
        SensorField::C6h6Gt,
        SensorField::Pt08S2Nmhc,
        SensorField::NoxGt,
        SensorField::Pt08S3Nox,
        SensorField::No2Gt,
        SensorField::Pt08S4No2,
        SensorField::Pt08S5O3,
        SensorField::Temperature,
        SensorField::RelativeHumidity,
        SensorField::AbsoluteHumidity,
    ];

    /// Column name used in the dataset and the trained feature schema
    pub fn column_name(self) -> &'static str {
        match self {
            SensorField::CoGt => "CO(GT)",
            SensorField::Pt08S1Co => "PT08.S1(CO)",
            SensorField::NmhcGt => "NMHC(GT)",
            SensorField::C6h6Gt => "C6H6(GT)",
            SensorField::Pt08S2Nmhc => "PT08.S2(NMHC)",
            SensorField::NoxGt => "NOx(GT)",
            SensorField::Pt08S3Nox => "PT08.S3(NOx)",
            SensorField::No2Gt => "NO2(GT)",
            SensorField::Pt08S4No2 => "PT08.S4(NO2)",
            SensorField::Pt08S5O3 => "PT08.S5(O3)",
            SensorField::Temperature => "T",
            SensorField::RelativeHumidity => "RH",
            SensorField::AbsoluteHumidity => "AH",
        }
    }

    /// Field name on the HTTP wire; the target has none
    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            SensorField::CoGt => None,
            SensorField::Pt08S1Co => Some("PT08_S1_CO"),
            SensorField::NmhcGt => Some("NMHC_GT"),
            SensorField::C6h6Gt => Some("C6H6_GT"),
            SensorField::Pt08S2Nmhc => Some("PT08_S2_NMHC"),
            SensorField::NoxGt => Some("NOx_GT"),
            SensorField::Pt08S3Nox => Some("PT08_S3_NOx"),
            SensorField::No2Gt => Some("NO2_GT"),
            SensorField::Pt08S4No2 => Some("PT08_S4_NO2"),
            SensorField::Pt08S5O3 => Some("PT08_S5_O3"),
            SensorField::Temperature => Some("T"),
            SensorField::RelativeHumidity => Some("RH"),
            SensorField::AbsoluteHumidity => Some("AH"),
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column_name() == name)
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == Some(name))
    }
}

/// One timestamped observation with named numeric fields
///
/// Field names are training-time column names (`PT08.S1(CO)`, `T`, ...).
/// Insertion order is preserved and becomes column order downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    fields: Vec<(String, f64)>,
}

impl Reading {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            fields: Vec::new(),
        }
    }

    /// Set a field, replacing any previous value under the same name
    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn fields(&self) -> &[(String, f64)] {
        &self.fields
    }

    /// Reject readings carrying NaN or infinite values
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.fields {
            if !value.is_finite() {
                return Err(PipelineError::DataParse(format!(
                    "field '{}' is not a finite number",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Parse a timestamp in any of the accepted layouts
///
/// Accepts ISO-8601 with `T` or space separator (optional fractional
/// seconds or missing seconds), RFC 3339 with an offset (kept as local
/// wall-clock time), and a bare date meaning midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for layout in LAYOUTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_local());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }
    Err(PipelineError::DataParse(format!(
        "unrecognised timestamp '{}'",
        raw
    )))
}

/// JSON body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "DateTime")]
    pub date_time: String,
    #[serde(rename = "PT08_S1_CO")]
    pub pt08_s1_co: f64,
    #[serde(rename = "NMHC_GT")]
    pub nmhc_gt: f64,
    #[serde(rename = "C6H6_GT")]
    pub c6h6_gt: f64,
    #[serde(rename = "PT08_S2_NMHC")]
    pub pt08_s2_nmhc: f64,
    #[serde(rename = "NOx_GT")]
    pub nox_gt: f64,
    #[serde(rename = "PT08_S3_NOx")]
    pub pt08_s3_nox: f64,
    #[serde(rename = "NO2_GT")]
    pub no2_gt: f64,
    #[serde(rename = "PT08_S4_NO2")]
    pub pt08_s4_no2: f64,
    #[serde(rename = "PT08_S5_O3")]
    pub pt08_s5_o3: f64,
    #[serde(rename = "T")]
    pub t: f64,
    #[serde(rename = "RH")]
    pub rh: f64,
    #[serde(rename = "AH")]
    pub ah: f64,
}

impl PredictionRequest {
    /// Documented example payload
    pub fn example() -> Self {
        Self {
            date_time: "2025-10-20T18:00:00".to_string(),
            pt08_s1_co: 1360.0,
            nmhc_gt: 150.0,
            c6h6_gt: 11.9,
            pt08_s2_nmhc: 1046.0,
            nox_gt: 166.0,
            pt08_s3_nox: 1056.0,
            no2_gt: 113.0,
            pt08_s4_no2: 1692.0,
            pt08_s5_o3: 1268.0,
            t: 13.6,
            rh: 48.9,
            ah: 0.7578,
        }
    }

    /// Sensor values paired with their field, in wire order
    pub fn values(&self) -> [(SensorField, f64); 12] {
        [
            (SensorField::Pt08S1Co, self.pt08_s1_co),
            (SensorField::NmhcGt, self.nmhc_gt),
            (SensorField::C6h6Gt, self.c6h6_gt),
            (SensorField::Pt08S2Nmhc, self.pt08_s2_nmhc),
            (SensorField::NoxGt, self.nox_gt),
            (SensorField::Pt08S3Nox, self.pt08_s3_nox),
            (SensorField::No2Gt, self.no2_gt),
            (SensorField::Pt08S4No2, self.pt08_s4_no2),
            (SensorField::Pt08S5O3, self.pt08_s5_o3),
            (SensorField::Temperature, self.t),
            (SensorField::RelativeHumidity, self.rh),
            (SensorField::AbsoluteHumidity, self.ah),
        ]
    }

    /// Multiply every sensor value by `factor`, keeping the timestamp
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            date_time: self.date_time.clone(),
            pt08_s1_co: self.pt08_s1_co * factor,
            nmhc_gt: self.nmhc_gt * factor,
            c6h6_gt: self.c6h6_gt * factor,
            pt08_s2_nmhc: self.pt08_s2_nmhc * factor,
            nox_gt: self.nox_gt * factor,
            pt08_s3_nox: self.pt08_s3_nox * factor,
            no2_gt: self.no2_gt * factor,
            pt08_s4_no2: self.pt08_s4_no2 * factor,
            pt08_s5_o3: self.pt08_s5_o3 * factor,
            t: self.t * factor,
            rh: self.rh * factor,
            ah: self.ah * factor,
        }
    }

    /// Translate wire names to training-time column names
    pub fn to_reading(&self) -> Result<Reading> {
        let timestamp = parse_timestamp(&self.date_time)?;
        let reading = self
            .values()
            .into_iter()
            .fold(Reading::new(timestamp), |r, (field, value)| {
                r.with_field(field.column_name(), value)
            });
        reading.validate()?;
        Ok(reading)
    }
}

/// Prediction output returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction_co_gt: f64,
    pub is_out_of_distribution: bool,
    pub model_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_wire_and_column_names_round_trip() {
        for field in SensorField::INPUTS {
            let wire = field.wire_name().unwrap();
            assert_eq!(SensorField::from_wire_name(wire), Some(field));
            assert_eq!(SensorField::from_column_name(field.column_name()), Some(field));
        }
        assert_eq!(SensorField::CoGt.wire_name(), None);
        assert_eq!(SensorField::from_column_name(TARGET_COLUMN), Some(SensorField::CoGt));
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let iso = parse_timestamp("2025-10-20T18:00:00").unwrap();
        assert_eq!(iso.hour(), 18);
        assert_eq!(parse_timestamp("2025-10-20 18:00:00").unwrap(), iso);
        assert_eq!(parse_timestamp("2025-10-20T18:00").unwrap(), iso);
        assert_eq!(parse_timestamp("2025-10-20T18:00:00+02:00").unwrap(), iso);
        assert_eq!(parse_timestamp("2025-10-20").unwrap().hour(), 0);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday at noon").unwrap_err();
        assert!(matches!(err, PipelineError::DataParse(_)));
        assert!(parse_timestamp("2025-13-40T99:00:00").is_err());
    }

    #[test]
    fn test_request_to_reading_translates_names() {
        let reading = PredictionRequest::example().to_reading().unwrap();
        assert_eq!(reading.get("PT08.S1(CO)"), Some(1360.0));
        assert_eq!(reading.get("NOx(GT)"), Some(166.0));
        assert_eq!(reading.get("AH"), Some(0.7578));
        assert_eq!(reading.get("PT08_S1_CO"), None);
        assert_eq!(reading.fields().len(), 12);
    }

    #[test]
    fn test_request_deserializes_wire_format() {
        let body = serde_json::json!({
            "DateTime": "2025-10-20T18:00:00",
            "PT08_S1_CO": 1360.0, "NMHC_GT": 150.0, "C6H6_GT": 11.9,
            "PT08_S2_NMHC": 1046.0, "NOx_GT": 166.0, "PT08_S3_NOx": 1056.0,
            "NO2_GT": 113.0, "PT08_S4_NO2": 1692.0, "PT08_S5_O3": 1268.0,
            "T": 13.6, "RH": 48.9, "AH": 0.7578
        });
        let request: PredictionRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request, PredictionRequest::example());
    }

    #[test]
    fn test_scaled_request_keeps_timestamp() {
        let scaled = PredictionRequest::example().scaled(100.0);
        assert_eq!(scaled.date_time, "2025-10-20T18:00:00");
        assert!((scaled.pt08_s1_co - 136_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_reading_rejects_non_finite() {
        let ts = parse_timestamp("2025-10-20T18:00:00").unwrap();
        let reading = Reading::new(ts).with_field("T", f64::NAN);
        assert!(matches!(reading.validate(), Err(PipelineError::DataParse(_))));
    }

    #[test]
    fn test_reading_set_replaces_existing() {
        let ts = parse_timestamp("2025-10-20T18:00:00").unwrap();
        let reading = Reading::new(ts).with_field("T", 1.0).with_field("T", 2.0);
        assert_eq!(reading.get("T"), Some(2.0));
        assert_eq!(reading.fields().len(), 1);
    }
}
