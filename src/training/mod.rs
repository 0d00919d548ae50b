//! Model training module
//!
//! Provides:
//! - Decision trees and Random Forests (default estimator)
//! - Linear baselines (OLS and logistic regression)
//! - Seeded train/evaluation splits, stratified for classification
//! - Preprocessing + estimator pipelines
//! - Held-out evaluation metrics

mod config;
mod engine;
pub mod decision_tree;
pub mod linear_models;
pub mod metrics;
pub mod pipeline;
pub mod random_forest;
pub mod split;

pub use config::{EstimatorConfig, EstimatorKind, MaxFeatures, TaskType, TrainingConfig};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{TrainEngine, TrainingOutcome};
pub use linear_models::{LinearRegression, LogisticRegression};
pub use metrics::MetricsReport;
pub use pipeline::{Estimator, ModelPipeline, PipelineBuilder};
pub use random_forest::RandomForest;
pub use split::{stratified_split, train_test_split, TrainTestSplit};
