//! Evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RMSE: &str = "rmse";
pub const MAE: &str = "mae";
pub const R2: &str = "r2";
pub const ACCURACY: &str = "accuracy";
pub const F1: &str = "f1";

/// Flat metric name -> value mapping, serialised as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsReport(BTreeMap<String, f64>);

impl MetricsReport {
    /// Root-mean-squared error, mean absolute error and R²
    pub fn regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let mse = ss_res / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        // Constant targets: a perfect fit scores 1, anything else 0
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        let mut report = Self::default();
        report.insert(RMSE, mse.sqrt());
        report.insert(MAE, mae);
        report.insert(R2, r2);
        report
    }

    /// Accuracy and the F-score of the positive class (label 1)
    ///
    /// F1 is 0 when precision and recall are both undefined or zero, which is
    /// the case when the evaluation labels hold a single negative class.
    pub fn classification(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len();
        let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
        let accuracy = if n > 0 { correct as f64 / n as f64 } else { 0.0 };

        let (tp, fp, fn_) = confusion_counts(y_true, y_pred, 1.0);
        let f1 = if 2 * tp + fp + fn_ > 0 {
            2.0 * tp as f64 / (2 * tp + fp + fn_) as f64
        } else {
            0.0
        };

        let mut report = Self::default();
        report.insert(ACCURACY, accuracy);
        report.insert(F1, f1);
        report
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// (true positives, false positives, false negatives)
fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>, positive: f64) -> (usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t == positive, *p == positive) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    (tp, fp, fn_)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![1.0, 2.0, 3.0, 6.0];

        let report = MetricsReport::regression(&y_true, &y_pred);
        assert_eq!(report.get(RMSE), Some(1.0));
        assert_eq!(report.get(MAE), Some(0.5));
        assert!((report.get(R2).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        let y = array![2.0, 2.0];
        assert_eq!(MetricsReport::regression(&y, &y).get(R2), Some(1.0));
        assert_eq!(
            MetricsReport::regression(&y, &array![1.0, 3.0]).get(R2),
            Some(0.0)
        );
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0];
        let y_pred = array![1.0, 0.0, 0.0, 1.0];

        let report = MetricsReport::classification(&y_true, &y_pred);
        assert_eq!(report.get(ACCURACY), Some(0.75));
        // precision 1, recall 2/3
        assert!((report.get(F1).unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_f1_degrades_to_zero() {
        let y_true = array![0.0, 0.0, 0.0];
        let report = MetricsReport::classification(&y_true, &y_true);
        assert_eq!(report.get(ACCURACY), Some(1.0));
        assert_eq!(report.get(F1), Some(0.0));
    }

    #[test]
    fn test_serializes_flat() {
        let y = array![1.0, 0.0];
        let json = serde_json::to_string(&MetricsReport::classification(&y, &y)).unwrap();
        assert_eq!(json, r#"{"accuracy":1.0,"f1":1.0}"#);
    }
}
