//! Raw retail transaction data
//!
//! - [`schema`] - column roles and the enumerated column lists
//! - [`dates`] - strict-then-lenient date parsing
//! - [`loader`] - CSV ingestion into a [`Dataset`]

pub mod dates;
pub mod loader;
pub mod schema;

pub use dates::{DateParser, ParsedDate};
pub use loader::{read_superstore, DataLoader};
pub use schema::{ColumnRole, ColumnSpec, Schema};

use crate::error::{DataWarning, Result, SuperstoreError};
use polars::prelude::*;

/// Transaction records plus the schema classifying their columns.
///
/// Records have no identity beyond their row position.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    schema: Schema,
    warnings: Vec<DataWarning>,
}

impl Dataset {
    /// Wrap a frame, classifying its columns with the declared roles.
    pub fn new(frame: DataFrame) -> Self {
        let schema = Schema::from_frame(&frame);
        Self {
            frame,
            schema,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn from_parts(frame: DataFrame, schema: Schema, warnings: Vec<DataWarning>) -> Self {
        Self {
            frame,
            schema,
            warnings,
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Non-fatal issues recorded while building this dataset.
    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Values of a column as `f64`, missing entries as `None`.
    ///
    /// Non-numeric text becomes `None` rather than an error.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        float_values(&self.frame, name)
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

/// Values of a frame column cast to `f64`.
pub(crate) fn float_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = frame
        .column(name)
        .map_err(|_| SuperstoreError::MissingColumn(name.to_string()))?;
    let casted = column.cast(&DataType::Float64)?;
    let values = casted.f64()?.into_iter().collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_casts_integers() {
        let df = df!(
            "Postal Code" => &[Some(10024i64), None, Some(90036)]
        )
        .unwrap();
        let dataset = Dataset::new(df);

        let values = dataset.numeric_values("Postal Code").unwrap();
        assert_eq!(values, vec![Some(10024.0), None, Some(90036.0)]);
    }

    #[test]
    fn test_numeric_values_missing_column() {
        let dataset = Dataset::new(df!("Sales" => &[1.0]).unwrap());
        let err = dataset.numeric_values("Profit").unwrap_err();
        assert!(matches!(err, SuperstoreError::MissingColumn(ref c) if c == "Profit"));
    }
}
