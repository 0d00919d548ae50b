//! One-hot encoding of categorical columns

use crate::error::{Result, SuperstoreError};
use ndarray::{Array2, ArrayViewMut2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One-hot encoder
///
/// Learns the sorted distinct categories of each column. At transform time
/// each column expands to one indicator per learned category. Categories
/// not seen during fit, and missing values, encode as all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn categories for `columns`
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.columns = columns.to_vec();
        self.categories = Vec::with_capacity(columns.len());

        for name in columns {
            let mut categories: Vec<String> = text_values(df, name)?.into_iter().flatten().collect();
            categories.sort_unstable();
            categories.dedup();
            debug!(column = %name, categories = categories.len(), "Learned categories");
            self.categories.push(categories);
        }

        self.is_fitted = true;
        Ok(self)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Learned categories of a column, sorted
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.categories[i].as_slice())
    }

    /// Number of indicator columns produced
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Indicator names as `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(col, cats)| cats.iter().map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((df.height(), self.n_outputs()));
        self.transform_into(df, out.view_mut())?;
        Ok(out)
    }

    /// Write indicators into a zero-initialised `(rows, n_outputs)` view
    pub fn transform_into(&self, df: &DataFrame, mut out: ArrayViewMut2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(SuperstoreError::ModelNotFitted);
        }
        if out.ncols() != self.n_outputs() || out.nrows() != df.height() {
            return Err(SuperstoreError::ShapeError {
                expected: format!("({}, {})", df.height(), self.n_outputs()),
                actual: format!("({}, {})", out.nrows(), out.ncols()),
            });
        }

        let mut offset = 0;
        for (name, categories) in self.columns.iter().zip(&self.categories) {
            let values = text_values(df, name)?;
            for (row, value) in values.iter().enumerate() {
                let Some(value) = value else { continue };
                if let Ok(idx) = categories.binary_search_by(|c| c.as_str().cmp(value.as_str())) {
                    out[[row, offset + idx]] = 1.0;
                }
            }
            offset += categories.len();
        }
        Ok(())
    }
}

// Column values as text; non-text columns are cast
fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| SuperstoreError::MissingColumn(name.to_string()))?;
    let text = column.cast(&DataType::String)?;
    let values: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_onehot_sorted_categories() {
        let df = df!(
            "Region" => &["West", "East", "West"],
            "Segment" => &["Consumer", "Corporate", "Consumer"]
        )
        .unwrap();

        let mut encoder = OneHotEncoder::new();
        encoder.fit(&df, &columns(&["Region", "Segment"])).unwrap();

        assert_eq!(
            encoder.feature_names(),
            vec!["Region_East", "Region_West", "Segment_Consumer", "Segment_Corporate"]
        );
        let encoded = encoder.transform(&df).unwrap();
        assert_eq!(
            encoded,
            array![
                [0.0, 1.0, 1.0, 0.0],
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 1.0, 0.0]
            ]
        );
    }

    #[test]
    fn test_unseen_and_missing_are_all_zero() {
        let train = df!("Region" => &["West", "East"]).unwrap();
        let test = df!("Region" => &[Some("Central"), None, Some("East")]).unwrap();

        let mut encoder = OneHotEncoder::new();
        encoder.fit(&train, &columns(&["Region"])).unwrap();

        let encoded = encoder.transform(&test).unwrap();
        assert_eq!(encoded, array![[0.0, 0.0], [0.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df!("Region" => &["West"]).unwrap();
        let encoder = OneHotEncoder::new();
        assert!(matches!(encoder.transform(&df), Err(SuperstoreError::ModelNotFitted)));
    }
}
