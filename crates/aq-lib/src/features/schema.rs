//! Trained feature schema
//!
//! An ordered list of named slots frozen at training time. Any feature
//! table is reindexed against it: absent slots take their fill value,
//! unknown columns are dropped and the order is forced to match.

use crate::data::FeatureTable;
use crate::error::{PipelineError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Default fill for a slot missing from the computed features
pub const DEFAULT_FILL: f64 = 0.0;

/// One named input of the trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSlot {
    pub name: String,
    pub fill: f64,
}

/// Result of reindexing a feature table
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFeatures {
    /// One row per table row, columns in schema order
    pub values: Array2<f64>,
    /// Schema slots that were absent and filled
    pub filled: Vec<String>,
    /// Table columns not in the schema
    pub dropped: Vec<String>,
}

/// Frozen, ordered feature layout expected by the scaler and models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    slots: Vec<FeatureSlot>,
}

impl FeatureSchema {
    /// Schema with the default fill for every slot
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: names
                .into_iter()
                .map(|n| FeatureSlot {
                    name: n.into(),
                    fill: DEFAULT_FILL,
                })
                .collect(),
        }
    }

    /// Schema made of every table column except `exclude`
    pub fn from_table(table: &FeatureTable, exclude: &[&str]) -> Self {
        Self::new(
            table
                .columns()
                .iter()
                .filter(|c| !exclude.contains(&c.as_str()))
                .cloned(),
        )
    }

    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fail unless a fitted component expects exactly this many features
    pub fn check_width(&self, component: &str, width: usize) -> Result<()> {
        if width != self.len() {
            return Err(PipelineError::FeatureAlignment(format!(
                "{} expects {} features but the schema has {}",
                component,
                width,
                self.len()
            )));
        }
        Ok(())
    }

    /// Reindex `table` to this schema
    pub fn align(&self, table: &FeatureTable) -> Result<AlignedFeatures> {
        let positions: Vec<Option<usize>> = self
            .slots
            .iter()
            .map(|slot| table.column_index(&slot.name))
            .collect();

        let filled = self
            .slots
            .iter()
            .zip(&positions)
            .filter(|(_, p)| p.is_none())
            .map(|(s, _)| s.name.clone())
            .collect();
        let dropped = table
            .columns()
            .iter()
            .filter(|c| !self.slots.iter().any(|s| &s.name == *c))
            .cloned()
            .collect();

        let source = table.values();
        let mut values = Array2::<f64>::zeros((table.len(), self.slots.len()));
        for (j, (slot, pos)) in self.slots.iter().zip(&positions).enumerate() {
            match pos {
                Some(p) => values.column_mut(j).assign(&source.column(*p)),
                None => values.column_mut(j).fill(slot.fill),
            }
        }
        if let Some(((i, j), _)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::FeatureAlignment(format!(
                "row {} feature '{}' is not a finite number",
                i, self.slots[j].name
            )));
        }

        Ok(AlignedFeatures {
            values,
            filled,
            dropped,
        })
    }
}
