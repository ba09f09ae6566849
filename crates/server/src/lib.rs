//! HTTP serving layer for the CO predictor

pub mod api;
pub mod config;
