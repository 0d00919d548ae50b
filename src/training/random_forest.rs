//! Random Forest implementation

use super::config::{EstimatorConfig, MaxFeatures, TaskType};
use super::decision_tree::{argmax, Criterion, DecisionTree, TreeTargets};
use crate::error::{Result, SuperstoreError};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Random Forest model
///
/// Each tree is seeded with `random_state + tree_index`, so the fitted forest
/// does not depend on how rayon schedules the trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features tried per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Classes (for classification)
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_regressor(300)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self::with_defaults(n_estimators, Criterion::Gini, MaxFeatures::Sqrt)
    }

    /// Create a new regressor forest
    pub fn new_regressor(n_estimators: usize) -> Self {
        Self::with_defaults(n_estimators, Criterion::SquaredError, MaxFeatures::All)
    }

    fn with_defaults(n_estimators: usize, criterion: Criterion, max_features: MaxFeatures) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
            bootstrap: true,
            criterion,
            random_state: 42,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Build an untrained forest for a task from estimator settings
    pub fn from_config(config: &EstimatorConfig, task: TaskType) -> Self {
        let mut forest = match task {
            TaskType::Classify => Self::new_classifier(config.n_estimators),
            TaskType::Regress => Self::new_regressor(config.n_estimators),
        };
        forest.max_depth = config.max_depth;
        forest.min_samples_split = config.min_samples_split;
        forest.min_samples_leaf = config.min_samples_leaf;
        forest.max_features = config.max_features_for(task);
        forest.bootstrap = config.bootstrap;
        forest.criterion = config.criterion_for(task);
        forest.random_state = config.random_seed;
        forest
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn is_classifier(&self) -> bool {
        !matches!(self.criterion, Criterion::SquaredError)
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(SuperstoreError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(SuperstoreError::TrainingError(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(SuperstoreError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();
        let targets = if self.is_classifier() {
            TreeTargets::classification(y.view())
        } else {
            TreeTargets::regression(y.view())
        };
        let max_features = self.max_features.resolve(n_features);
        let base_seed = self.random_state;
        let x_view = x.view();

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Bootstrap sample as row indices
                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new_regressor()
                    .with_criterion(self.criterion)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(seed);
                tree.max_depth = self.max_depth;

                tree.fit_indices(x_view, &targets, &sample_indices, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = n_features;
        self.classes = targets.classes().to_vec();

        debug!(
            trees = self.trees.len(),
            samples = n_samples,
            features = n_features,
            max_features,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted random forest"
        );
        Ok(self)
    }

    fn check_fitted(&self, x: &Array2<f64>) -> Result<()> {
        if self.trees.is_empty() {
            return Err(SuperstoreError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(SuperstoreError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Predict targets
    ///
    /// Regression averages the trees; classification takes the class with
    /// the highest mean probability, ties going to the lower label.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.is_classifier() {
            let proba = self.predict_proba(x)?;
            let predictions: Array1<f64> = proba
                .rows()
                .into_iter()
                .map(|row| self.classes[argmax(&row.to_vec())])
                .collect();
            return Ok(predictions);
        }

        self.check_fitted(x)?;
        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        // Summed in tree order so results do not depend on thread count
        let mut total = Array1::zeros(x.nrows());
        for predictions in &per_tree {
            total += predictions;
        }
        Ok(total / self.trees.len() as f64)
    }

    /// Mean class probabilities, one column per entry of [`classes`](Self::classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_classifier() {
            return Err(SuperstoreError::TrainingError(
                "predict_proba requires a classification forest".to_string(),
            ));
        }
        self.check_fitted(x)?;

        let per_tree: Vec<Array2<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x.view()))
            .collect::<Result<Vec<_>>>()?;

        let mut total = Array2::zeros((x.nrows(), self.classes.len()));
        for proba in &per_tree {
            total += proba;
        }
        Ok(total / self.trees.len() as f64)
    }

    /// Classes seen during fit (classification only)
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut rf = RandomForest::new_classifier(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_regressor() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut rf = RandomForest::new_regressor(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        assert!(mse < 2.0, "MSE too high: {}", mse);
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [0.1, 0.0], [0.9, 1.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut rf = RandomForest::new_classifier(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (4, 2));
        for i in 0..proba.nrows() {
            let row_sum: f64 = proba.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-9, "Row {} sum: {}", i, row_sum);
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let x = array![[1.0, 5.0], [2.0, 3.0], [3.0, 8.0], [4.0, 1.0], [5.0, 2.0], [6.0, 7.0]];
        let y = array![1.5, 2.0, 3.5, 4.0, 5.5, 6.0];

        let mut a = RandomForest::new_regressor(25).with_random_state(7);
        let mut b = RandomForest::new_regressor(25).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![1.0, 1.0, 1.0];

        let mut rf = RandomForest::new_classifier(5);
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.classes(), &[1.0]);
        assert_eq!(rf.predict(&x).unwrap(), array![1.0, 1.0, 1.0]);
    }
}
