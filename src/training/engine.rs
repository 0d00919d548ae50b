//! Training engine: split, fit, evaluate

use super::config::{TaskType, TrainingConfig};
use super::metrics::MetricsReport;
use super::pipeline::{ModelPipeline, PipelineBuilder};
use super::split::{stratified_split, take_rows, train_test_split, TrainTestSplit};
use crate::error::{DataWarning, Result, SuperstoreError};
use crate::preprocessing::FeatureSet;
use std::time::Instant;
use tracing::{info, warn};

/// Fitted pipeline plus its held-out evaluation
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: ModelPipeline,
    pub metrics: MetricsReport,
    pub warnings: Vec<DataWarning>,
    pub n_train: usize,
    pub n_test: usize,
    pub training_time_secs: f64,
}

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Partition rows of a feature set. Classification preserves class
    /// proportions in both partitions.
    pub fn split(&self, features: &FeatureSet) -> Result<TrainTestSplit> {
        match features.task {
            TaskType::Classify => {
                stratified_split(&features.y, self.config.test_size, self.config.random_seed)
            }
            TaskType::Regress => train_test_split(
                features.n_samples(),
                self.config.test_size,
                self.config.random_seed,
            ),
        }
    }

    /// Fit a fresh pipeline on the training partition and score it on the
    /// evaluation partition.
    pub fn fit(&self, features: &FeatureSet) -> Result<TrainingOutcome> {
        self.config.validate()?;
        if features.task != self.config.task {
            return Err(SuperstoreError::ConfigError(format!(
                "feature set was selected for task '{}' but the engine is configured for '{}'",
                features.task, self.config.task
            )));
        }

        let start = Instant::now();
        let split = self.split(features)?;
        let (x_train, y_train) = take_rows(features, &split.train)?;
        let (x_test, y_test) = take_rows(features, &split.test)?;

        let mut pipeline = PipelineBuilder::new(features.task)
            .with_estimator_config(self.config.estimator.clone())
            .build_for(features);
        pipeline.fit(&x_train, &y_train)?;

        let y_pred = pipeline.predict(&x_test)?;
        let mut warnings = Vec::new();
        let metrics = match features.task {
            TaskType::Regress => MetricsReport::regression(&y_test, &y_pred),
            TaskType::Classify => {
                if let Some(label) = single_label(y_test.iter().copied()) {
                    warn!(
                        target_column = %features.target,
                        label,
                        "Evaluation partition holds a single class; f1 is degenerate"
                    );
                    warnings.push(DataWarning::DegenerateSplit { label });
                }
                MetricsReport::classification(&y_test, &y_pred)
            }
        };

        let training_time_secs = start.elapsed().as_secs_f64();
        info!(
            target_column = %features.target,
            task = %features.task,
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            elapsed_secs = training_time_secs,
            "Training complete"
        );

        Ok(TrainingOutcome {
            pipeline,
            metrics,
            warnings,
            n_train: split.train.len(),
            n_test: split.test.len(),
            training_time_secs,
        })
    }
}

// The only label present, if there is exactly one
fn single_label(mut labels: impl Iterator<Item = f64>) -> Option<f64> {
    let first = labels.next()?;
    labels.all(|v| v == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::EstimatorKind;
    use ndarray::Array1;
    use polars::prelude::*;

    fn feature_set(task: TaskType, y: Vec<f64>) -> FeatureSet {
        let n = y.len();
        let quantity: Vec<i64> = (0..n as i64).collect();
        let region: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "West" } else { "East" }).collect();
        FeatureSet {
            x: df!("Quantity" => quantity, "Region" => region).unwrap(),
            y: Array1::from_vec(y),
            numeric: vec!["Quantity".to_string()],
            categorical: vec!["Region".to_string()],
            target: "Target".to_string(),
            task,
        }
    }

    #[test]
    fn test_regression_fit() {
        let features = feature_set(TaskType::Regress, (0..20).map(|i| i as f64 * 2.0).collect());
        let engine = TrainEngine::new(
            TrainingConfig::new(TaskType::Regress, "Target").with_n_estimators(20),
        );

        let outcome = engine.fit(&features).unwrap();
        assert_eq!(outcome.n_test, 4);
        assert_eq!(outcome.n_train, 16);
        let keys: Vec<&str> = outcome.metrics.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["mae", "r2", "rmse"]);
        assert!(outcome.metrics.iter().all(|(_, v)| v.is_finite()));
    }

    #[test]
    fn test_classification_single_class() {
        let features = feature_set(TaskType::Classify, vec![0.0; 10]);
        let engine = TrainEngine::new(
            TrainingConfig::new(TaskType::Classify, "Target")
                .with_estimator(EstimatorKind::Linear),
        );

        let outcome = engine.fit(&features).unwrap();
        assert_eq!(outcome.metrics.get("accuracy"), Some(1.0));
        assert_eq!(outcome.metrics.get("f1"), Some(0.0));
        assert_eq!(outcome.warnings, vec![DataWarning::DegenerateSplit { label: 0.0 }]);
    }

    #[test]
    fn test_task_mismatch() {
        let features = feature_set(TaskType::Regress, vec![1.0; 10]);
        let engine = TrainEngine::new(TrainingConfig::new(TaskType::Classify, "Target"));
        assert!(matches!(engine.fit(&features), Err(SuperstoreError::ConfigError(_))));
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let y: Vec<f64> = (0..30).map(|i| ((i * 7) % 11) as f64).collect();
        let features = feature_set(TaskType::Regress, y);
        let config = TrainingConfig::new(TaskType::Regress, "Target").with_n_estimators(15);

        let a = TrainEngine::new(config.clone()).fit(&features).unwrap();
        let b = TrainEngine::new(config).fit(&features).unwrap();
        assert_eq!(a.metrics, b.metrics);
    }
}
