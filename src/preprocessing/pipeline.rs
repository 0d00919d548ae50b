//! Column preprocessing stage of the model pipeline

use super::encoder::OneHotEncoder;
use crate::data::float_values;
use crate::error::{Result, SuperstoreError};
use ndarray::{s, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Numeric pass-through plus one-hot categorical expansion
///
/// The column lists are fixed at construction. Output columns are the
/// numeric columns in order (missing values as NaN) followed by the
/// indicator columns of each categorical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    encoder: OneHotEncoder,
    is_fitted: bool,
    /// Timing: seconds spent in last fit call
    fit_time: Option<f64>,
}

impl DataPreprocessor {
    pub fn new(numeric_columns: Vec<String>, categorical_columns: Vec<String>) -> Self {
        Self {
            numeric_columns,
            categorical_columns,
            encoder: OneHotEncoder::new(),
            is_fitted: false,
            fit_time: None,
        }
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    /// Learn categorical levels from the training frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();
        self.check_columns(df)?;
        self.encoder.fit(df, &self.categorical_columns)?;
        self.is_fitted = true;
        self.fit_time = Some(start.elapsed().as_secs_f64());

        debug!(
            numeric = self.numeric_columns.len(),
            indicators = self.encoder.n_outputs(),
            "Fitted preprocessor"
        );
        Ok(self)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(SuperstoreError::ModelNotFitted);
        }
        self.check_columns(df)?;

        let n_numeric = self.numeric_columns.len();
        let mut out = Array2::zeros((df.height(), self.n_features_out()));

        for (j, name) in self.numeric_columns.iter().enumerate() {
            let values = float_values(df, name)?;
            for (i, value) in values.into_iter().enumerate() {
                out[[i, j]] = value.unwrap_or(f64::NAN);
            }
        }

        self.encoder
            .transform_into(df, out.slice_mut(s![.., n_numeric..]))?;
        Ok(out)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Width of the transformed matrix
    pub fn n_features_out(&self) -> usize {
        self.numeric_columns.len() + self.encoder.n_outputs()
    }

    /// Names of the transformed columns
    pub fn feature_names_out(&self) -> Vec<String> {
        let mut names = self.numeric_columns.clone();
        names.extend(self.encoder.feature_names());
        names
    }

    fn check_columns(&self, df: &DataFrame) -> Result<()> {
        for name in self.numeric_columns.iter().chain(self.categorical_columns.iter()) {
            if df.column(name).is_err() {
                return Err(SuperstoreError::MissingColumn(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprocessor() -> DataPreprocessor {
        DataPreprocessor::new(
            vec!["Quantity".to_string(), "Discount".to_string()],
            vec!["Region".to_string()],
        )
    }

    #[test]
    fn test_numeric_pass_through_then_indicators() {
        let df = df!(
            "Quantity" => &[2i64, 5],
            "Discount" => &[Some(0.1), None],
            "Region" => &["West", "East"]
        )
        .unwrap();

        let mut pre = preprocessor();
        let out = pre.fit_transform(&df).unwrap();

        assert_eq!(out.shape(), &[2, 4]);
        assert_eq!(out[[0, 0]], 2.0);
        assert_eq!(out[[0, 1]], 0.1);
        assert!(out[[1, 1]].is_nan());
        assert_eq!(out.row(0).slice(s![2..]).to_vec(), vec![0.0, 1.0]);
        assert_eq!(
            pre.feature_names_out(),
            vec!["Quantity", "Discount", "Region_East", "Region_West"]
        );
    }

    #[test]
    fn test_missing_column_at_transform() {
        let train = df!(
            "Quantity" => &[1i64],
            "Discount" => &[0.0],
            "Region" => &["West"]
        )
        .unwrap();
        let mut pre = preprocessor();
        pre.fit(&train).unwrap();

        let test = df!("Quantity" => &[1i64], "Region" => &["West"]).unwrap();
        let err = pre.transform(&test).unwrap_err();
        assert!(matches!(err, SuperstoreError::MissingColumn(ref c) if c == "Discount"));
    }
}
