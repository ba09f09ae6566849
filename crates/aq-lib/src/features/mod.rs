//! Feature engineering and the trained feature schema

mod engineer;
mod schema;

pub use engineer::{
    cyclical_hour, FeatureEngineer, TemporalFeatures, DAY, DAY_OF_WEEK, DERIVED_COLUMNS,
    HOUR_COS, HOUR_SIN, IS_WEEKEND, MONTH, NMHC_BENZENE, NOX_NO2, O3_NOX,
};
pub use schema::{AlignedFeatures, FeatureSchema, FeatureSlot, DEFAULT_FILL};
