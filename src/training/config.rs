//! Training configuration

use super::decision_tree::Criterion;
use crate::data::schema::PROFIT;
use crate::error::{Result, SuperstoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Type of learning task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Continuous target
    #[default]
    Regress,
    /// Binary 0/1 target
    Classify,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Regress => "regress",
            TaskType::Classify => "classify",
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, TaskType::Classify)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = SuperstoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regress" | "regression" => Ok(TaskType::Regress),
            "classify" | "classification" => Ok(TaskType::Classify),
            other => Err(SuperstoreError::ConfigError(format!(
                "unknown task '{}', expected 'regress' or 'classify'",
                other
            ))),
        }
    }
}

/// Estimator family fitted after preprocessing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorKind {
    /// Bagged ensemble of decision trees
    #[default]
    RandomForest,
    /// Least squares for regression, logistic regression for classification
    Linear,
}

impl EstimatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorKind::RandomForest => "random-forest",
            EstimatorKind::Linear => "linear",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimatorKind {
    type Err = SuperstoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random-forest" | "random_forest" | "rf" => Ok(EstimatorKind::RandomForest),
            "linear" => Ok(EstimatorKind::Linear),
            other => Err(SuperstoreError::ConfigError(format!(
                "unknown estimator '{}', expected 'random-forest' or 'linear'",
                other
            ))),
        }
    }
}

/// Number of features considered at each tree split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Default policy for a task: sqrt for classification, all for regression
    pub fn for_task(task: TaskType) -> Self {
        match task {
            TaskType::Classify => MaxFeatures::Sqrt,
            TaskType::Regress => MaxFeatures::All,
        }
    }

    /// Resolve to a feature count in `1..=n_features`
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f) as usize,
            MaxFeatures::Fixed(k) => *k,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Estimator hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub kind: EstimatorKind,
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum tree depth (None = unlimited)
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split (None = task default)
    pub max_features: Option<MaxFeatures>,
    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,
    /// Split criterion (None = gini for classify, squared error for regress)
    pub criterion: Option<Criterion>,
    pub random_seed: u64,
    /// L2 penalty for linear regression; 0 is ordinary least squares
    pub alpha: f64,
    /// Inverse L2 strength for logistic regression
    pub regularization_c: f64,
    /// Gradient steps for logistic regression
    pub max_iter: usize,
    pub learning_rate: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            kind: EstimatorKind::RandomForest,
            n_estimators: 300,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            criterion: None,
            random_seed: 42,
            alpha: 0.0,
            regularization_c: 1.0,
            max_iter: 500,
            learning_rate: 0.1,
        }
    }
}

impl EstimatorConfig {
    pub fn with_kind(mut self, kind: EstimatorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Split criterion, falling back to the task default
    pub fn criterion_for(&self, task: TaskType) -> Criterion {
        self.criterion.unwrap_or(match task {
            TaskType::Classify => Criterion::Gini,
            TaskType::Regress => Criterion::SquaredError,
        })
    }

    /// Max-features policy, falling back to the task default
    pub fn max_features_for(&self, task: TaskType) -> MaxFeatures {
        self.max_features.unwrap_or_else(|| MaxFeatures::for_task(task))
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(SuperstoreError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(SuperstoreError::ConfigError(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(SuperstoreError::ConfigError(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if let Some(MaxFeatures::Fraction(f)) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(SuperstoreError::ConfigError(format!(
                    "max_features fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }
        if !(self.alpha >= 0.0) || !self.alpha.is_finite() {
            return Err(SuperstoreError::ConfigError(format!(
                "alpha must be a finite value >= 0, got {}",
                self.alpha
            )));
        }
        if !(self.regularization_c > 0.0) || !(self.learning_rate > 0.0) || self.max_iter == 0 {
            return Err(SuperstoreError::ConfigError(
                "linear estimator settings must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub task: TaskType,
    /// Target column name
    pub target: String,
    /// Fraction of records held out for evaluation
    pub test_size: f64,
    /// Seed for the train/evaluation split
    pub random_seed: u64,
    pub estimator: EstimatorConfig,
    pub models_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            task: TaskType::Regress,
            target: PROFIT.to_string(),
            test_size: 0.2,
            random_seed: 42,
            estimator: EstimatorConfig::default(),
            models_dir: PathBuf::from("models"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl TrainingConfig {
    pub fn new(task: TaskType, target: impl Into<String>) -> Self {
        Self {
            task,
            target: target.into(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields keep defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn with_estimator(mut self, kind: EstimatorKind) -> Self {
        self.estimator.kind = kind;
        self
    }

    pub fn with_estimator_config(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.estimator.n_estimators = n;
        self
    }

    /// Seed both the split and the estimator
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self.estimator.random_seed = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(SuperstoreError::ConfigError("target must not be empty".to_string()));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(SuperstoreError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if let Some(criterion) = self.estimator.criterion {
            let fits_task = match self.task {
                TaskType::Classify => matches!(criterion, Criterion::Gini | Criterion::Entropy),
                TaskType::Regress => criterion == Criterion::SquaredError,
            };
            if !fits_task {
                return Err(SuperstoreError::ConfigError(format!(
                    "criterion {:?} cannot be used for {} targets",
                    criterion, self.task
                )));
            }
        }
        self.estimator.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.task, TaskType::Regress);
        assert_eq!(config.target, "Profit");
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.estimator.n_estimators, 300);
        assert_eq!(config.estimator.random_seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainingConfig::new(TaskType::Classify, "IsProfitable")
            .with_estimator(EstimatorKind::Linear)
            .with_n_estimators(50)
            .with_random_seed(7);

        assert_eq!(config.estimator.kind, EstimatorKind::Linear);
        assert_eq!(config.estimator.n_estimators, 50);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.estimator.random_seed, 7);
    }

    #[test]
    fn test_task_parsing() {
        assert_eq!("regress".parse::<TaskType>().unwrap(), TaskType::Regress);
        assert_eq!("Classify".parse::<TaskType>().unwrap(), TaskType::Classify);
        assert!("cluster".parse::<TaskType>().is_err());
        assert_eq!(TaskType::Classify.to_string(), "classify");
        assert_eq!("linear".parse::<EstimatorKind>().unwrap(), EstimatorKind::Linear);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"task": "classify", "estimator": {"n_estimators": 10}}"#).unwrap();
        assert_eq!(config.task, TaskType::Classify);
        assert_eq!(config.estimator.n_estimators, 10);
        assert_eq!(config.estimator.kind, EstimatorKind::RandomForest);
        assert_eq!(config.target, "Profit");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(TrainingConfig::default().with_test_size(1.0).validate().is_err());
        assert!(TrainingConfig::default().with_n_estimators(0).validate().is_err());
    }

    #[test]
    fn test_criterion_and_alpha_from_json() {
        let config: TrainingConfig = serde_json::from_str(
            r#"{"task": "classify", "estimator": {"criterion": "entropy", "alpha": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.estimator.criterion, Some(Criterion::Entropy));
        assert_eq!(config.estimator.alpha, 0.5);
        assert!(config.validate().is_ok());
        assert_eq!(config.estimator.criterion_for(TaskType::Classify), Criterion::Entropy);
        assert_eq!(
            EstimatorConfig::default().criterion_for(TaskType::Regress),
            Criterion::SquaredError
        );
    }

    #[test]
    fn test_criterion_must_fit_task() {
        let entropy = EstimatorConfig::default().with_criterion(Criterion::Entropy);
        let config = TrainingConfig::new(TaskType::Regress, "Profit").with_estimator_config(entropy);
        assert!(config.validate().is_err());

        let negative = EstimatorConfig::default().with_alpha(-1.0);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(100), 10);
        assert_eq!(MaxFeatures::Sqrt.resolve(2), 1);
        assert_eq!(MaxFeatures::All.resolve(7), 7);
        assert_eq!(MaxFeatures::Fixed(50).resolve(7), 7);
        assert_eq!(MaxFeatures::for_task(TaskType::Classify), MaxFeatures::Sqrt);
    }
}
