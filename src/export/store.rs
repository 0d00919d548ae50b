//! Persistent store for fitted pipelines and their metrics

use crate::error::{Result, SuperstoreError};
use crate::training::{MetricsReport, ModelPipeline, TaskType};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MODEL_EXTENSION: &str = "bin";
pub const METRICS_FILE: &str = "metrics.json";

/// Identity of an artifact: one model file per (target, task)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub target: String,
    pub task: TaskType,
}

impl ArtifactKey {
    pub fn new(target: impl Into<String>, task: TaskType) -> Self {
        Self {
            target: target.into(),
            task,
        }
    }

    /// `<target>_<task>`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.target, self.task.as_str())
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// Where a completed run left its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub metrics: PathBuf,
}

/// Model files live under `models_dir`, the latest run's metrics under
/// `reports_dir`.
///
/// A run is complete when both files exist and the metrics file is not older
/// than the model file. [`save`](Self::save) removes the previous metrics
/// document before touching the model, and each file is written to a
/// temporary sibling and renamed into place, so neither file is ever observed
/// half-written.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    models_dir: PathBuf,
    reports_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(models_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }

    pub fn model_path(&self, key: &ArtifactKey) -> PathBuf {
        self.models_dir
            .join(format!("{}.{}", key.file_stem(), MODEL_EXTENSION))
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.reports_dir.join(METRICS_FILE)
    }

    /// Persist a fitted pipeline and its metrics, overwriting earlier runs
    pub fn save(
        &self,
        key: &ArtifactKey,
        pipeline: &ModelPipeline,
        metrics: &MetricsReport,
    ) -> Result<ArtifactPaths> {
        if !pipeline.is_fitted() {
            return Err(SuperstoreError::ModelNotFitted);
        }

        fs::create_dir_all(&self.models_dir)?;
        fs::create_dir_all(&self.reports_dir)?;

        let model_path = self.model_path(key);
        let metrics_path = self.metrics_path();

        // Stale metrics must not survive a run that fails below
        match fs::remove_file(&metrics_path) {
            Ok(()) => debug!(path = %metrics_path.display(), "Removed previous metrics"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let bytes = bincode::serialize(pipeline)?;
        write_atomic(&model_path, |w| Ok(w.write_all(&bytes)?))?;
        write_atomic(&metrics_path, |w| write_json(w, metrics))?;

        info!(
            key = %key,
            model = %model_path.display(),
            metrics = %metrics_path.display(),
            model_bytes = bytes.len(),
            "Saved artifacts"
        );

        Ok(ArtifactPaths {
            model: model_path,
            metrics: metrics_path,
        })
    }

    /// Load a persisted pipeline back for scoring
    pub fn load_pipeline(&self, key: &ArtifactKey) -> Result<ModelPipeline> {
        let path = self.model_path(key);
        let file = File::open(&path).map_err(|e| {
            SuperstoreError::DataError(format!("Failed to open model '{}': {}", path.display(), e))
        })?;
        let pipeline: ModelPipeline = bincode::deserialize_from(BufReader::new(file))?;

        if pipeline.task() != key.task {
            return Err(SuperstoreError::ValidationError(format!(
                "model '{}' was trained for task '{}'",
                path.display(),
                pipeline.task()
            )));
        }
        Ok(pipeline)
    }

    /// Metrics of the most recent completed run
    pub fn load_metrics(&self) -> Result<MetricsReport> {
        let path = self.metrics_path();
        let file = File::open(&path).map_err(|e| {
            SuperstoreError::DataError(format!("Failed to open metrics '{}': {}", path.display(), e))
        })?;
        let metrics: MetricsReport = serde_json::from_reader(BufReader::new(file))?;
        Ok(metrics)
    }
}

fn write_json<T: Serialize>(writer: &mut BufWriter<File>, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

// Write to `<path>.tmp`, flush to disk, then rename over `path`
fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let result = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        write(&mut writer)?;
        let file = writer
            .into_inner()
            .map_err(|e| SuperstoreError::IoError(e.into_error()))?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::PipelineBuilder;
    use ndarray::array;
    use polars::prelude::*;

    fn fitted_pipeline() -> ModelPipeline {
        let x = df!("Quantity" => &[1i64, 2, 3, 4]).unwrap();
        let y = array![1.0, 2.0, 3.0, 4.0];
        let mut pipeline = PipelineBuilder::new(TaskType::Regress)
            .build(&["Quantity".to_string()], &[]);
        pipeline.fit(&x, &y).unwrap();
        pipeline
    }

    #[test]
    fn test_file_stem() {
        let key = ArtifactKey::new("IsProfitable", TaskType::Classify);
        assert_eq!(key.file_stem(), "IsProfitable_classify");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("models"), dir.path().join("reports"));
        let key = ArtifactKey::new("Profit", TaskType::Regress);

        let pipeline = fitted_pipeline();
        let mut metrics = MetricsReport::default();
        metrics.insert("rmse", 0.5);

        let paths = store.save(&key, &pipeline, &metrics).unwrap();
        assert_eq!(paths.model, dir.path().join("models").join("Profit_regress.bin"));
        assert!(paths.metrics.exists());

        let loaded = store.load_pipeline(&key).unwrap();
        let x = df!("Quantity" => &[2i64]).unwrap();
        assert_eq!(loaded.predict(&x).unwrap(), pipeline.predict(&x).unwrap());
        assert_eq!(store.load_metrics().unwrap(), metrics);
        assert!(!dir.path().join("models").join("Profit_regress.bin.tmp").exists());
    }

    #[test]
    fn test_unfitted_pipeline_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("models"), dir.path().join("reports"));
        let key = ArtifactKey::new("Profit", TaskType::Regress);
        let pipeline = PipelineBuilder::new(TaskType::Regress).build(&["Quantity".to_string()], &[]);

        let result = store.save(&key, &pipeline, &MetricsReport::default());
        assert!(matches!(result, Err(SuperstoreError::ModelNotFitted)));
        assert!(!store.model_path(&key).exists());
        assert!(!store.metrics_path().exists());
    }

    #[test]
    fn test_metrics_reload_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("models"), dir.path().join("reports"));
        let key = ArtifactKey::new("Profit", TaskType::Regress);

        let mut metrics = MetricsReport::default();
        metrics.insert("rmse", 43.593262094043844);
        metrics.insert("mae", 0.1 + 0.2);
        metrics.insert("r2", 1.0 / 3.0);
        store.save(&key, &fitted_pipeline(), &metrics).unwrap();

        let loaded = store.load_metrics().unwrap();
        for (name, value) in metrics.iter() {
            assert_eq!(loaded.get(name).map(f64::to_bits), Some(value.to_bits()), "{}", name);
        }
    }
}
