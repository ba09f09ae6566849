//! Time-indexed numeric table
//!
//! Dense `f64` matrix with one timestamp per row and an ordered list of
//! column names. Used for both raw readings and engineered features.

use crate::error::{PipelineError, Result};
use crate::models::Reading;
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Ordered named columns over timestamped rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    timestamps: Vec<NaiveDateTime>,
    values: Array2<f64>,
}

/// Table of imputed sensor readings
pub type ReadingTable = Table;

/// Table of engineered features
pub type FeatureTable = Table;

impl Table {
    /// Build a table, checking the matrix against the columns and timestamps
    pub fn new(
        columns: Vec<String>,
        timestamps: Vec<NaiveDateTime>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if timestamps.len() != values.nrows() {
            return Err(PipelineError::Shape(format!(
                "{} timestamps for {} rows",
                timestamps.len(),
                values.nrows()
            )));
        }
        if values.ncols() != columns.len() {
            return Err(PipelineError::Shape(format!(
                "{} columns named for {} values per row",
                columns.len(),
                values.ncols()
            )));
        }
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(PipelineError::Shape(format!("duplicate column '{}'", name)));
            }
        }
        Ok(Self {
            columns,
            timestamps,
            values,
        })
    }

    /// Build a table from readings that all carry the same field names
    pub fn from_readings(readings: &[Reading]) -> Result<Self> {
        let Some(first) = readings.first() else {
            return Self::new(Vec::new(), Vec::new(), Array2::zeros((0, 0)));
        };
        let columns: Vec<String> = first.fields().iter().map(|(n, _)| n.clone()).collect();
        let mut flat = Vec::with_capacity(readings.len() * columns.len());
        for (i, reading) in readings.iter().enumerate() {
            if reading.fields().len() != columns.len() {
                return Err(PipelineError::Shape(format!(
                    "reading {} has {} fields, expected {}",
                    i,
                    reading.fields().len(),
                    columns.len()
                )));
            }
            for c in &columns {
                flat.push(reading.get(c).ok_or_else(|| {
                    PipelineError::Shape(format!("reading {} lacks field '{}'", i, c))
                })?);
            }
        }
        let values = Array2::from_shape_vec((readings.len(), columns.len()), flat)
            .map_err(|e| PipelineError::Shape(e.to_string()))?;
        let timestamps = readings.iter().map(|r| r.timestamp).collect();
        Self::new(columns, timestamps, values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy out one column by name
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.values.column(idx).to_vec())
    }

    /// Append a column; fails if the name exists or the length is wrong
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.column_index(&name).is_some() {
            return Err(PipelineError::Shape(format!("duplicate column '{}'", name)));
        }
        self.check_length(&name, &values)?;
        self.values
            .push_column(Array1::from(values).view())
            .map_err(|e| PipelineError::Shape(format!("column '{}': {}", name, e)))?;
        self.columns.push(name);
        Ok(())
    }

    /// Overwrite the column called `name`, or append it when absent
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        let Some(idx) = self.column_index(&name) else {
            return self.push_column(name, values);
        };
        self.check_length(&name, &values)?;
        self.values.column_mut(idx).assign(&Array1::from(values));
        Ok(())
    }

    /// Remove a column by name, returning its values
    pub fn drop_column(&mut self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        let removed = self.values.column(idx).to_vec();
        let keep: Vec<usize> = (0..self.width()).filter(|&c| c != idx).collect();
        self.values = self.values.select(Axis(1), &keep);
        self.columns.remove(idx);
        Some(removed)
    }

    fn check_length(&self, name: &str, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(PipelineError::Shape(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;
    use ndarray::array;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn sample() -> Table {
        Table::new(
            vec!["a".into(), "b".into()],
            vec![ts("2004-03-10T18:00:00"), ts("2004-03-10T19:00:00")],
            array![[1.0, 2.0], [3.0, 4.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_validation() {
        let err = Table::new(
            vec!["a".into()],
            vec![ts("2004-03-10T18:00:00")],
            array![[1.0, 2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Shape(_)));

        let err = Table::new(vec!["a".into()], vec![], array![[1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Shape(_)));

        let err =
            Table::new(vec!["a".into(), "a".into()], vec![], Array2::zeros((0, 2))).unwrap_err();
        assert!(matches!(err, PipelineError::Shape(_)));
    }

    #[test]
    fn test_push_and_drop_column() {
        let mut table = sample();
        table.push_column("c", vec![5.0, 6.0]).unwrap();
        assert_eq!(table.columns(), ["a", "b", "c"]);
        assert_eq!(table.column("c"), Some(vec![5.0, 6.0]));

        assert!(table.push_column("c", vec![0.0, 0.0]).is_err());
        assert!(table.push_column("d", vec![0.0]).is_err());

        assert_eq!(table.drop_column("a"), Some(vec![1.0, 3.0]));
        assert_eq!(table.values(), array![[2.0, 5.0], [4.0, 6.0]]);
        assert_eq!(table.drop_column("missing"), None);
    }

    #[test]
    fn test_set_column_replaces_in_place() {
        let mut table = sample();
        table.set_column("a", vec![7.0, 8.0]).unwrap();
        assert_eq!(table.columns(), ["a", "b"]);
        assert_eq!(table.values(), array![[7.0, 2.0], [8.0, 4.0]]);

        table.set_column("c", vec![0.5, 0.5]).unwrap();
        assert_eq!(table.columns(), ["a", "b", "c"]);
        assert!(table.set_column("b", vec![1.0]).is_err());
    }

    #[test]
    fn test_from_readings() {
        let readings = vec![
            Reading::new(ts("2004-03-10T18:00:00"))
                .with_field("T", 13.6)
                .with_field("RH", 48.9),
            Reading::new(ts("2004-03-10T19:00:00"))
                .with_field("RH", 47.7)
                .with_field("T", 13.3),
        ];
        let table = Table::from_readings(&readings).unwrap();
        assert_eq!(table.columns(), ["T", "RH"]);
        assert_eq!(table.values().row(1).to_vec(), vec![13.3, 47.7]);

        let mismatched = vec![
            readings[0].clone(),
            Reading::new(ts("2004-03-10T20:00:00")).with_field("T", 1.0),
        ];
        assert!(Table::from_readings(&mismatched).is_err());
        assert!(Table::from_readings(&[]).unwrap().is_empty());
    }
}
