//! Superstore training CLI
//!
//! One command: ingest a CSV, engineer features, fit and evaluate a model for
//! a (target, task) pair, and persist the artifacts.

use anyhow::Context;
use clap::Parser;
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::data::DataLoader;
use crate::export::{ArtifactKey, ArtifactPaths, ArtifactStore};
use crate::feature_engineering::FeatureEngineer;
use crate::preprocessing::FeatureSelector;
use crate::training::{EstimatorKind, MetricsReport, TaskType, TrainEngine, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "superstore-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and evaluate a model on Superstore retail transactions")]
#[command(long_about = None)]
pub struct Cli {
    /// Input transactions file (CSV with header)
    #[arg(long)]
    pub csv: PathBuf,

    /// Target column name [default: Profit]
    #[arg(long)]
    pub target: Option<String>,

    /// Task type (regress, classify) [default: regress]
    #[arg(long)]
    pub task: Option<TaskType>,

    /// Estimator (random-forest, linear) [default: random-forest]
    #[arg(long)]
    pub estimator: Option<EstimatorKind>,

    /// Number of trees in the forest [default: 300]
    #[arg(long)]
    pub n_estimators: Option<usize>,

    /// Seed for the split and the estimator [default: 42]
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for model files [default: models]
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Directory for the metrics document [default: reports]
    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    /// JSON training configuration; flags given on the command line win
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Resolve the run configuration from the optional file plus flags
    pub fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_json_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => TrainingConfig::default(),
        };

        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(task) = self.task {
            config.task = task;
        }
        if let Some(kind) = self.estimator {
            config = config.with_estimator(kind);
        }
        if let Some(n) = self.n_estimators {
            config = config.with_n_estimators(n);
        }
        if let Some(seed) = self.seed {
            config = config.with_random_seed(seed);
        }
        if let Some(dir) = &self.models_dir {
            config = config.with_models_dir(dir.clone());
        }
        if let Some(dir) = &self.reports_dir {
            config = config.with_reports_dir(dir.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Outcome of a successful run, as printed to stdout
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub paths: ArtifactPaths,
    pub metrics: MetricsReport,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Run the full pipeline. Each failure carries the name of its stage.
pub fn cmd_train(cli: &Cli) -> anyhow::Result<RunSummary> {
    let config = cli.training_config().context("configuration")?;
    let total = Instant::now();

    section("Train");
    kv("Target", &config.target);
    kv("Task", config.task.as_str());
    kv("Estimator", &config.estimator.kind.to_string());

    step_run("Loading data");
    let start = Instant::now();
    let dataset = DataLoader::new().load(&cli.csv).context("ingestion")?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        dataset.height(),
        dataset.width(),
        start.elapsed()
    ));

    step_run("Engineering features");
    let start = Instant::now();
    let dataset = FeatureEngineer::new()
        .transform(&dataset)
        .context("feature engineering")?;
    step_done(&format!("{} cols in {:?}", dataset.width(), start.elapsed()));

    step_run("Selecting features");
    let features = FeatureSelector::for_schema(dataset.schema(), &config.target, config.task)
        .and_then(|selector| selector.select(&dataset))
        .context("feature selection")?;
    step_done(&format!(
        "{} numeric, {} categorical",
        features.numeric.len(),
        features.categorical.len()
    ));

    step_run(&format!("Training {}", config.estimator.kind.to_string().cyan()));
    let outcome = TrainEngine::new(config.clone())
        .fit(&features)
        .context("training")?;
    step_done(&format!(
        "{} train / {} eval in {:.3}s",
        outcome.n_train, outcome.n_test, outcome.training_time_secs
    ));

    step_run("Saving artifacts");
    let store = ArtifactStore::new(&config.models_dir, &config.reports_dir);
    let key = ArtifactKey::new(&config.target, config.task);
    let paths = store
        .save(&key, &outcome.pipeline, &outcome.metrics)
        .context("artifact store")?;
    step_done(&key.file_stem());

    let warnings = dataset.warnings().len() + outcome.warnings.len();
    if warnings > 0 {
        println!("  {} {} data warning(s), see log", "!".yellow(), warnings);
    }

    println!();
    for (name, value) in outcome.metrics.iter() {
        println!("  {:<16} {}", muted(name), format!("{:.4}", value).white().bold());
    }
    kv("Time", &format!("{:.3}s", total.elapsed().as_secs_f64()));
    println!();

    println!("Saved model to {}", paths.model.display());
    println!("Metrics: {}", outcome.metrics.to_json_pretty()?);

    Ok(RunSummary {
        paths,
        metrics: outcome.metrics,
    })
}
