//! Superstore ML - training pipeline for retail transaction data
//!
//! A single batch run flows strictly downward:
//!
//! 1. [`data`] - CSV ingestion, whitespace trimming, two-stage date parsing,
//!    de-duplication
//! 2. [`feature_engineering`] - shipping delay, order date parts,
//!    profitability flag, median repair, discount clamping
//! 3. [`preprocessing`] - leakage-safe predictor selection and one-hot
//!    encoding
//! 4. [`training`] - seeded split, random forest (or linear) pipeline,
//!    held-out metrics
//! 5. [`export`] - model file keyed by `<target>_<task>` plus a metrics
//!    document
//!
//! The [`cli`] module wires these stages into the `superstore-train` binary.

// Core error handling
pub mod error;

// Data processing
pub mod data;
pub mod feature_engineering;

// Core ML modules
pub mod preprocessing;
pub mod training;

// Persistence and interface
pub mod export;
pub mod cli;

pub use error::{DataWarning, Result, SuperstoreError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DataWarning, Result, SuperstoreError};

    // Data
    pub use crate::data::{read_superstore, DataLoader, Dataset, DateParser, Schema};

    // Feature engineering
    pub use crate::feature_engineering::{add_basic_features, FeatureEngineer};

    // Preprocessing
    pub use crate::preprocessing::{
        select_features, DataPreprocessor, FeatureSelector, FeatureSet, OneHotEncoder,
    };

    // Training
    pub use crate::training::{
        EstimatorConfig, EstimatorKind, MetricsReport, ModelPipeline, PipelineBuilder,
        RandomForest, TaskType, TrainEngine, TrainingConfig, TrainingOutcome,
    };

    // Export
    pub use crate::export::{ArtifactKey, ArtifactPaths, ArtifactStore};
}
