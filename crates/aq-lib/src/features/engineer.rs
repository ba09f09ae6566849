//! Feature derivation for the CO regression model
//!
//! Adds calendar fields, a cyclical encoding of the hour of day and
//! pairwise pollutant interactions to a reading table. The transform is a
//! pure function of its input.

use crate::data::{FeatureTable, ReadingTable};
use crate::error::Result;
use crate::models::SensorField;
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::f64::consts::PI;

pub const DAY: &str = "Day";
pub const MONTH: &str = "Month";
pub const DAY_OF_WEEK: &str = "DayOfWeek";
pub const IS_WEEKEND: &str = "IsWeekend";
pub const HOUR_SIN: &str = "Hour_sin";
pub const HOUR_COS: &str = "Hour_cos";
pub const NOX_NO2: &str = "NOx_NO2";
pub const NMHC_BENZENE: &str = "NMHC_Benzene";
pub const O3_NOX: &str = "O3_NOx";

/// Derived columns in the order they are appended
pub const DERIVED_COLUMNS: [&str; 9] = [
    DAY,
    MONTH,
    DAY_OF_WEEK,
    IS_WEEKEND,
    HOUR_SIN,
    HOUR_COS,
    NOX_NO2,
    NMHC_BENZENE,
    O3_NOX,
];

/// Pairwise products: output name and the two operand columns
const INTERACTIONS: [(&str, SensorField, SensorField); 3] = [
    (NOX_NO2, SensorField::NoxGt, SensorField::No2Gt),
    (NMHC_BENZENE, SensorField::NmhcGt, SensorField::C6h6Gt),
    (O3_NOX, SensorField::Pt08S5O3, SensorField::NoxGt),
];

/// Calendar and cyclical values derived from one timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalFeatures {
    pub day: f64,
    pub month: f64,
    /// Monday = 0 ... Sunday = 6
    pub day_of_week: f64,
    pub is_weekend: f64,
    pub hour_sin: f64,
    pub hour_cos: f64,
}

impl TemporalFeatures {
    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        let weekday = ts.weekday().num_days_from_monday();
        let (hour_sin, hour_cos) = cyclical_hour(ts.hour());
        Self {
            day: ts.day() as f64,
            month: ts.month() as f64,
            day_of_week: weekday as f64,
            is_weekend: if weekday >= 5 { 1.0 } else { 0.0 },
            hour_sin,
            hour_cos,
        }
    }
}

/// `sin(2π·h/24)`, `cos(2π·h/24)`
pub fn cyclical_hour(hour: u32) -> (f64, f64) {
    let angle = 2.0 * PI * hour as f64 / 24.0;
    (angle.sin(), angle.cos())
}

/// Derives the engineered feature table from a reading table
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// Append derived columns to a copy of `readings`
    ///
    /// Input columns keep their order; derived columns follow in
    /// [`DERIVED_COLUMNS`] order. An input column that already carries a
    /// derived name is overwritten in place. An interaction is skipped when
    /// one of its operands is absent, and the hour itself is never emitted.
    pub fn transform(&self, readings: &ReadingTable) -> Result<FeatureTable> {
        let temporal: Vec<TemporalFeatures> = readings
            .timestamps()
            .iter()
            .map(TemporalFeatures::from_timestamp)
            .collect();

        let mut table = readings.clone();
        table.set_column(DAY, temporal.iter().map(|t| t.day).collect())?;
        table.set_column(MONTH, temporal.iter().map(|t| t.month).collect())?;
        table.set_column(DAY_OF_WEEK, temporal.iter().map(|t| t.day_of_week).collect())?;
        table.set_column(IS_WEEKEND, temporal.iter().map(|t| t.is_weekend).collect())?;
        table.set_column(HOUR_SIN, temporal.iter().map(|t| t.hour_sin).collect())?;
        table.set_column(HOUR_COS, temporal.iter().map(|t| t.hour_cos).collect())?;

        for (name, left, right) in INTERACTIONS {
            let (Some(l), Some(r)) = (
                readings.column(left.column_name()),
                readings.column(right.column_name()),
            ) else {
                continue;
            };
            table.set_column(name, l.iter().zip(&r).map(|(a, b)| a * b).collect())?;
        }

        Ok(table)
    }
}
