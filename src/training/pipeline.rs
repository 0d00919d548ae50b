//! Preprocessing + estimator composed into one trainable unit

use super::config::{EstimatorConfig, EstimatorKind, TaskType};
use super::linear_models::{LinearRegression, LogisticRegression};
use super::random_forest::RandomForest;
use crate::error::{Result, SuperstoreError};
use crate::preprocessing::{DataPreprocessor, FeatureSet};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Fitted or unfitted estimator stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    RandomForestRegressor(RandomForest),
    RandomForestClassifier(RandomForest),
    LinearRegression(LinearRegression),
    LogisticRegression(LogisticRegression),
}

impl Estimator {
    /// Estimator matching a task and estimator settings
    pub fn for_task(task: TaskType, config: &EstimatorConfig) -> Self {
        match (config.kind, task) {
            (EstimatorKind::RandomForest, TaskType::Regress) => {
                Estimator::RandomForestRegressor(RandomForest::from_config(config, task))
            }
            (EstimatorKind::RandomForest, TaskType::Classify) => {
                Estimator::RandomForestClassifier(RandomForest::from_config(config, task))
            }
            (EstimatorKind::Linear, TaskType::Regress) => {
                Estimator::LinearRegression(LinearRegression::new().with_alpha(config.alpha))
            }
            (EstimatorKind::Linear, TaskType::Classify) => Estimator::LogisticRegression(
                LogisticRegression::new()
                    .with_c(config.regularization_c)
                    .with_max_iter(config.max_iter)
                    .with_learning_rate(config.learning_rate),
            ),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Estimator::RandomForestRegressor(_) => "RandomForestRegressor",
            Estimator::RandomForestClassifier(_) => "RandomForestClassifier",
            Estimator::LinearRegression(_) => "LinearRegression",
            Estimator::LogisticRegression(_) => "LogisticRegression",
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Estimator::RandomForestRegressor(m) | Estimator::RandomForestClassifier(m) => {
                m.fit(x, y)?;
            }
            Estimator::LinearRegression(m) => {
                m.fit(x, y)?;
            }
            Estimator::LogisticRegression(m) => {
                m.fit(x, y)?;
            }
        }
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::RandomForestRegressor(m) | Estimator::RandomForestClassifier(m) => m.predict(x),
            Estimator::LinearRegression(m) => m.predict(x),
            Estimator::LogisticRegression(m) => m.predict(x),
        }
    }

    /// Class probabilities with one column per class (classifiers only)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Estimator::RandomForestClassifier(m) => m.predict_proba(x),
            Estimator::LogisticRegression(m) => {
                let positive = m.predict_proba(x)?;
                if m.classes().len() == 1 {
                    return Ok(positive.insert_axis(ndarray::Axis(1)));
                }
                let mut proba = Array2::zeros((x.nrows(), 2));
                for (i, p) in positive.iter().enumerate() {
                    proba[[i, 0]] = 1.0 - p;
                    proba[[i, 1]] = *p;
                }
                Ok(proba)
            }
            _ => Err(SuperstoreError::TrainingError(format!(
                "{} does not produce class probabilities",
                self.name()
            ))),
        }
    }
}

/// Column preprocessing followed by an estimator
///
/// Fitting fits both stages in one pass on the same frame; predicting
/// applies the learned preprocessing and then the learned estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPipeline {
    task: TaskType,
    preprocessor: DataPreprocessor,
    estimator: Estimator,
    is_fitted: bool,
}

impl ModelPipeline {
    pub fn task(&self) -> TaskType {
        self.task
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn numeric_columns(&self) -> &[String] {
        self.preprocessor.numeric_columns()
    }

    pub fn categorical_columns(&self) -> &[String] {
        self.preprocessor.categorical_columns()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Names of the columns the estimator sees
    pub fn feature_names_out(&self) -> Vec<String> {
        self.preprocessor.feature_names_out()
    }

    pub fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        if x.height() != y.len() {
            return Err(SuperstoreError::ShapeError {
                expected: format!("y length = {}", x.height()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let start = Instant::now();
        let matrix = self.preprocessor.fit_transform(x)?;
        self.estimator.fit(&matrix, y)?;
        self.is_fitted = true;

        info!(
            estimator = self.estimator.name(),
            rows = matrix.nrows(),
            features = matrix.ncols(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted model pipeline"
        );
        Ok(self)
    }

    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(SuperstoreError::ModelNotFitted);
        }
        let matrix = self.preprocessor.transform(x)?;
        self.estimator.predict(&matrix)
    }

    pub fn predict_proba(&self, x: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(SuperstoreError::ModelNotFitted);
        }
        let matrix = self.preprocessor.transform(x)?;
        self.estimator.predict_proba(&matrix)
    }
}

/// Assembles untrained pipelines for a task
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    task: TaskType,
    estimator: EstimatorConfig,
}

impl PipelineBuilder {
    pub fn new(task: TaskType) -> Self {
        Self {
            task,
            estimator: EstimatorConfig::default(),
        }
    }

    pub fn with_estimator(mut self, kind: EstimatorKind) -> Self {
        self.estimator.kind = kind;
        self
    }

    pub fn with_estimator_config(mut self, config: EstimatorConfig) -> Self {
        self.estimator = config;
        self
    }

    pub fn task(&self) -> TaskType {
        self.task
    }

    /// Untrained pipeline over fixed column lists
    pub fn build(&self, numeric: &[String], categorical: &[String]) -> ModelPipeline {
        ModelPipeline {
            task: self.task,
            preprocessor: DataPreprocessor::new(numeric.to_vec(), categorical.to_vec()),
            estimator: Estimator::for_task(self.task, &self.estimator),
            is_fitted: false,
        }
    }

    pub fn build_for(&self, features: &FeatureSet) -> ModelPipeline {
        self.build(&features.numeric, &features.categorical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Criterion;
    use ndarray::array;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn frame() -> DataFrame {
        df!(
            "Quantity" => &[1i64, 2, 3, 4, 5, 6],
            "Region" => &["West", "West", "West", "East", "East", "East"]
        )
        .unwrap()
    }

    #[test]
    fn test_classifier_pipeline_fit_predict() {
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let config = EstimatorConfig::default().with_n_estimators(10);
        let mut pipeline = PipelineBuilder::new(TaskType::Classify)
            .with_estimator_config(config)
            .build(&columns(&["Quantity"]), &columns(&["Region"]));

        assert!(matches!(pipeline.estimator(), Estimator::RandomForestClassifier(_)));
        pipeline.fit(&frame(), &y).unwrap();

        assert_eq!(pipeline.predict(&frame()).unwrap(), y);
        assert_eq!(
            pipeline.feature_names_out(),
            vec!["Quantity", "Region_East", "Region_West"]
        );
    }

    #[test]
    fn test_unseen_category_at_predict() {
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut pipeline = PipelineBuilder::new(TaskType::Regress)
            .with_estimator(EstimatorKind::Linear)
            .build(&columns(&["Quantity"]), &columns(&["Region"]));
        pipeline.fit(&frame(), &y).unwrap();

        let unseen = df!("Quantity" => &[3i64], "Region" => &["Central"]).unwrap();
        let predictions = pipeline.predict(&unseen).unwrap();
        assert!(predictions[0].is_finite());
    }

    #[test]
    fn test_estimator_settings_reach_the_model() {
        let config = EstimatorConfig::default()
            .with_criterion(Criterion::Entropy)
            .with_alpha(2.5);

        match Estimator::for_task(TaskType::Classify, &config) {
            Estimator::RandomForestClassifier(forest) => assert_eq!(forest.criterion, Criterion::Entropy),
            other => panic!("unexpected estimator {}", other.name()),
        }

        let linear = config.with_kind(EstimatorKind::Linear);
        match Estimator::for_task(TaskType::Regress, &linear) {
            Estimator::LinearRegression(model) => assert_eq!(model.alpha(), 2.5),
            other => panic!("unexpected estimator {}", other.name()),
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let pipeline = PipelineBuilder::new(TaskType::Regress).build(&columns(&["Quantity"]), &[]);
        assert!(matches!(pipeline.predict(&frame()), Err(SuperstoreError::ModelNotFitted)));
    }
}
