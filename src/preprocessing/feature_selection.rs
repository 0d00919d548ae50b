//! Leakage-safe feature selection
//!
//! Predictor columns come from two fixed lists (numeric and categorical)
//! intersected with the columns actually present. The target never appears
//! among the predictors, and the financial columns in
//! [`LEAKAGE_COLUMNS`] are only ever used as a target, never as an input for
//! a different target.
//!
//! Column lists are resolved once from the [`Schema`] when the selector is
//! built; [`FeatureSelector::select`] then only materialises them.

use crate::data::schema::{CATEGORICAL_COLUMNS, LEAKAGE_COLUMNS, NUMERIC_PREDICTORS};
use crate::data::{float_values, Dataset, Schema};
use crate::error::{Result, SuperstoreError};
use crate::training::TaskType;
use ndarray::Array1;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Model inputs for one (target, task) pair
///
/// `x` holds the numeric predictors followed by the categorical ones, so
/// `numeric` and `categorical` partition its columns exactly.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub x: DataFrame,
    pub y: Array1<f64>,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub target: String,
    pub task: TaskType,
}

impl FeatureSet {
    pub fn n_samples(&self) -> usize {
        self.y.len()
    }

    /// Predictor names in `x` column order
    pub fn feature_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Resolves and extracts predictors for a target
#[derive(Debug, Clone)]
pub struct FeatureSelector {
    target: String,
    task: TaskType,
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl FeatureSelector {
    /// Resolve predictor lists for `target` against the columns in `schema`.
    pub fn for_schema(schema: &Schema, target: &str, task: TaskType) -> Result<Self> {
        if !schema.contains(target) {
            return Err(SuperstoreError::MissingColumn(target.to_string()));
        }

        let numeric = Self::candidates(schema, &NUMERIC_PREDICTORS, target);
        let categorical = Self::candidates(schema, &CATEGORICAL_COLUMNS, target);

        if numeric.is_empty() && categorical.is_empty() {
            return Err(SuperstoreError::ValidationError(format!(
                "no predictor columns available for target '{}'",
                target
            )));
        }

        debug!(
            target_column = target,
            task = %task,
            numeric = ?numeric,
            categorical = ?categorical,
            "Resolved predictor columns"
        );

        Ok(Self {
            target: target.to_string(),
            task,
            numeric,
            categorical,
        })
    }

    // Present, not the target, and never a leakage column for another target
    fn candidates(schema: &Schema, list: &[&str], target: &str) -> Vec<String> {
        list.iter()
            .filter(|c| schema.contains(c))
            .filter(|c| **c != target)
            .filter(|c| !LEAKAGE_COLUMNS.contains(c))
            .map(|c| c.to_string())
            .collect()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn task(&self) -> TaskType {
        self.task
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical
    }

    /// Extract X and y from a dataset.
    ///
    /// Records whose target is missing are dropped. For classification the
    /// observed target values must lie in {0, 1}; a single class is accepted.
    pub fn select(&self, dataset: &Dataset) -> Result<FeatureSet> {
        let frame = dataset.frame();
        for name in self.numeric.iter().chain(self.categorical.iter()) {
            if frame.column(name).is_err() {
                return Err(SuperstoreError::MissingColumn(name.clone()));
            }
        }

        let target_values = self.target_values(frame)?;
        if self.task.is_classification() {
            self.validate_binary(&target_values)?;
        }

        let keep: Vec<bool> = target_values.iter().map(|v| v.is_some()).collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        let y: Array1<f64> = target_values.into_iter().flatten().collect();
        if y.is_empty() {
            return Err(SuperstoreError::DataError(format!(
                "target '{}' has no observed values",
                self.target
            )));
        }

        let columns = self.numeric.iter().chain(self.categorical.iter()).map(String::as_str);
        let mut x = frame.select(columns)?;
        if dropped > 0 {
            warn!(target_column = %self.target, dropped, "Dropped records with a missing target");
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            x = x.filter(&mask)?;
        }

        info!(
            target_column = %self.target,
            task = %self.task,
            rows = y.len(),
            numeric = self.numeric.len(),
            categorical = self.categorical.len(),
            "Selected features"
        );

        Ok(FeatureSet {
            x,
            y,
            numeric: self.numeric.clone(),
            categorical: self.categorical.clone(),
            target: self.target.clone(),
            task: self.task,
        })
    }

    // Target as f64, with NaN treated as missing
    fn target_values(&self, frame: &DataFrame) -> Result<Vec<Option<f64>>> {
        let column = frame
            .column(&self.target)
            .map_err(|_| SuperstoreError::MissingColumn(self.target.clone()))?;
        if matches!(column.dtype(), DataType::String) {
            return Err(SuperstoreError::InvalidTarget {
                column: self.target.clone(),
                reason: "target must be numeric".to_string(),
            });
        }

        let values = float_values(frame, &self.target)?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Ok(values)
    }

    fn validate_binary(&self, values: &[Option<f64>]) -> Result<()> {
        let mut invalid: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| *v != 0.0 && *v != 1.0)
            .collect();
        if invalid.is_empty() {
            return Ok(());
        }

        invalid.sort_by(|a, b| a.total_cmp(b));
        invalid.dedup();
        let shown: Vec<String> = invalid.iter().take(5).map(|v| v.to_string()).collect();
        Err(SuperstoreError::InvalidTarget {
            column: self.target.clone(),
            reason: format!(
                "classification target must be binary 0/1, found {}",
                shown.join(", ")
            ),
        })
    }
}

/// Resolve and extract predictors in one step.
pub fn select_features(dataset: &Dataset, target: &str, task: TaskType) -> Result<FeatureSet> {
    FeatureSelector::for_schema(dataset.schema(), target, task)?.select(dataset)
}
