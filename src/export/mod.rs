//! Model export and persistence
//!
//! Fitted pipelines are stored in bincode under `<target>_<task>.bin`;
//! the latest run's metrics go to a pretty-printed JSON document.

mod store;

pub use store::{ArtifactKey, ArtifactPaths, ArtifactStore, METRICS_FILE, MODEL_EXTENSION};
