//! Data preprocessing module
//!
//! - Leakage-safe selection of predictor columns for a target
//! - One-hot encoding of categorical columns
//! - The column preprocessing stage used inside the model pipeline

pub mod encoder;
pub mod feature_selection;
mod pipeline;

pub use encoder::OneHotEncoder;
pub use feature_selection::{select_features, FeatureSelector, FeatureSet};
pub use pipeline::DataPreprocessor;
