//! Decision tree implementation
//!
//! CART tree stored as a flat node arena. Building and prediction are both
//! iterative, so deep trees on large datasets never recurse.
//!
//! Split search first profiles each candidate feature within the node.
//! Constant features are skipped without counting against `max_features`.
//! Two-valued features (one-hot indicators) have a single possible split,
//! scored in one counting pass. Any other feature is sorted once and the
//! sorted order is swept, updating left/right statistics incrementally. Samples compare with `value <= threshold`, so NaN
//! always goes right.

use crate::error::{Result, SuperstoreError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node. Holds `[mean]` for regression and class probabilities
    /// (aligned to the tree's classes) for classification.
    Leaf { values: Vec<f64>, n_samples: usize },
    /// Internal node with split; children are arena indices
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Squared error (regression)
    SquaredError,
}

/// Training targets in the form trees consume them
///
/// A forest builds this once and shares it across all trees, so every
/// classification tree agrees on the class order.
#[derive(Debug, Clone)]
pub struct TreeTargets {
    values: Vec<f64>,
    class_index: Vec<usize>,
    classes: Vec<f64>,
}

impl TreeTargets {
    pub fn regression(y: ArrayView1<f64>) -> Self {
        Self {
            values: y.to_vec(),
            class_index: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Classes are the sorted distinct labels of `y`
    pub fn classification(y: ArrayView1<f64>) -> Self {
        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        classes.dedup();
        let class_index = y.iter().map(|v| classes.partition_point(|c| c < v)).collect();
        Self {
            values: y.to_vec(),
            class_index,
            classes,
        }
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn is_classification(&self) -> bool {
        !self.classes.is_empty()
    }
}

/// Running sufficient statistics of a sample set
#[derive(Debug, Clone)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl NodeStats {
    fn empty(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn from_indices(targets: &TreeTargets, indices: &[usize]) -> Self {
        let mut stats = Self::empty(targets.classes.len());
        for &i in indices {
            stats.add(targets, i);
        }
        stats
    }

    fn add(&mut self, targets: &TreeTargets, i: usize) {
        let y = targets.values[i];
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
        if let Some(&c) = targets.class_index.get(i) {
            self.class_counts[c] += 1;
        }
    }

    fn remove(&mut self, targets: &TreeTargets, i: usize) {
        let y = targets.values[i];
        self.count -= 1;
        self.sum -= y;
        self.sq_sum -= y * y;
        if let Some(&c) = targets.class_index.get(i) {
            self.class_counts[c] -= 1;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::SquaredError => {
                let mean = self.sum / n;
                (self.sq_sum / n - mean * mean).max(0.0)
            }
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum::<f64>()
            }
            Criterion::Entropy => self
                .class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    -p * p.log2()
                })
                .sum(),
        }
    }

    fn leaf_values(&self) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        if self.class_counts.is_empty() {
            vec![self.sum / n]
        } else {
            self.class_counts.iter().map(|&c| c as f64 / n).collect()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

const MIN_GAIN: f64 = 1e-12;

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node arena; the root is node 0
    nodes: Vec<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum features to consider per split
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed used by `fit`
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Classes (for classification)
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self::with_criterion_default(Criterion::Gini)
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self::with_criterion_default(Criterion::SquaredError)
    }

    fn with_criterion_default(criterion: Criterion) -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion,
            random_state: 42,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set number of features tried per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn is_classifier(&self) -> bool {
        !matches!(self.criterion, Criterion::SquaredError)
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Classes seen during fit (classification only)
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(SuperstoreError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let targets = if self.is_classifier() {
            TreeTargets::classification(y.view())
        } else {
            TreeTargets::regression(y.view())
        };
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        self.fit_indices(x.view(), &targets, &indices, &mut rng)?;
        Ok(self)
    }

    /// Fit on the rows listed in `indices`. Repeated indices weight a row
    /// by its multiplicity, which is how bootstrap samples are expressed.
    pub fn fit_indices(
        &mut self,
        x: ArrayView2<f64>,
        targets: &TreeTargets,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        if x.nrows() != targets.len() {
            return Err(SuperstoreError::ShapeError {
                expected: format!("targets length = {}", x.nrows()),
                actual: format!("targets length = {}", targets.len()),
            });
        }
        if indices.is_empty() {
            return Err(SuperstoreError::TrainingError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }
        if self.is_classifier() != targets.is_classification() {
            return Err(SuperstoreError::TrainingError(format!(
                "criterion {:?} does not match the target kind",
                self.criterion
            )));
        }

        self.n_features = x.ncols();
        self.classes = targets.classes.clone();
        self.nodes = Vec::new();

        let n_classes = targets.classes.len();
        let mut stack: Vec<(usize, Vec<usize>, usize)> = Vec::new();
        self.nodes.push(TreeNode::Leaf {
            values: Vec::new(),
            n_samples: 0,
        });
        stack.push((0, indices.to_vec(), 0));

        while let Some((node_id, node_indices, depth)) = stack.pop() {
            let stats = NodeStats::from_indices(targets, &node_indices);
            let impurity = stats.impurity(self.criterion);
            let n_samples = node_indices.len();

            let should_stop = n_samples < self.min_samples_split
                || n_samples < 2 * self.min_samples_leaf
                || self.max_depth.map_or(false, |d| depth >= d)
                || impurity <= MIN_GAIN;

            let split = if should_stop {
                None
            } else {
                self.find_best_split(x, targets, &node_indices, &stats, rng)
            };

            let Some(split) = split else {
                self.nodes[node_id] = TreeNode::Leaf {
                    values: stats.leaf_values(),
                    n_samples,
                };
                continue;
            };

            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = node_indices
                .iter()
                .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

            let left = self.nodes.len();
            let right = left + 1;
            let placeholder = TreeNode::Leaf {
                values: vec![0.0; n_classes.max(1)],
                n_samples: 0,
            };
            self.nodes.push(placeholder.clone());
            self.nodes.push(placeholder);
            self.nodes[node_id] = TreeNode::Split {
                feature_idx: split.feature_idx,
                threshold: split.threshold,
                left,
                right,
                n_samples,
                impurity,
            };

            stack.push((right, right_indices, depth + 1));
            stack.push((left, left_indices, depth + 1));
        }

        Ok(())
    }

    fn find_best_split(
        &self,
        x: ArrayView2<f64>,
        targets: &TreeTargets,
        indices: &[usize],
        parent: &NodeStats,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));
        let mut features: Vec<usize> = (0..n_features).collect();
        if n_try < n_features {
            features.shuffle(rng);
        }

        let mut best: Option<SplitCandidate> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(indices.len());
        let mut evaluated = 0;

        // Features constant in this node do not count against `n_try`, so
        // drawing continues until enough splittable features were searched.
        for feature_idx in features {
            if evaluated == n_try {
                break;
            }
            let candidate = match value_profile(x, feature_idx, indices) {
                ValueProfile::Constant => continue,
                ValueProfile::TwoValued { low, high } => {
                    self.two_valued_split(x, targets, indices, parent, feature_idx, low, high)
                }
                ValueProfile::Many => {
                    self.sorted_split(x, targets, indices, parent, feature_idx, &mut sorted)
                }
            };
            evaluated += 1;

            if let Some(candidate) = candidate {
                if best.map_or(true, |b| candidate.gain > b.gain) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Weighted impurity decrease of a left/right partition
    fn split_gain(&self, parent: &NodeStats, left: &NodeStats, right: &NodeStats) -> f64 {
        let n = parent.count as f64;
        let weighted = (left.count as f64 * left.impurity(self.criterion)
            + right.count as f64 * right.impurity(self.criterion))
            / n;
        parent.impurity(self.criterion) - weighted
    }

    /// A feature with two observed values has one possible split, scored
    /// with a single counting pass: rows at `low` go left.
    #[allow(clippy::too_many_arguments)]
    fn two_valued_split(
        &self,
        x: ArrayView2<f64>,
        targets: &TreeTargets,
        indices: &[usize],
        parent: &NodeStats,
        feature_idx: usize,
        low: f64,
        high: f64,
    ) -> Option<SplitCandidate> {
        let mut left = NodeStats::empty(parent.class_counts.len());
        let mut right = parent.clone();
        for &i in indices {
            if x[[i, feature_idx]] == low {
                left.add(targets, i);
                right.remove(targets, i);
            }
        }

        if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
            return None;
        }
        let gain = self.split_gain(parent, &left, &right);
        (gain > MIN_GAIN).then(|| SplitCandidate {
            feature_idx,
            threshold: split_threshold(low, high),
            gain,
        })
    }

    /// Sort the node's rows by the feature and sweep every boundary between
    /// distinct values. NaN sorts last and never joins the left side.
    fn sorted_split(
        &self,
        x: ArrayView2<f64>,
        targets: &TreeTargets,
        indices: &[usize],
        parent: &NodeStats,
        feature_idx: usize,
        sorted: &mut Vec<(f64, usize)>,
    ) -> Option<SplitCandidate> {
        sorted.clear();
        sorted.extend(indices.iter().map(|&i| (x[[i, feature_idx]], i)));
        sorted.sort_by(|a, b| nan_last(a.0, b.0));

        let mut left = NodeStats::empty(parent.class_counts.len());
        let mut right = parent.clone();
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..sorted.len().saturating_sub(1) {
            let (value, i) = sorted[pos];
            if value.is_nan() {
                break;
            }
            left.add(targets, i);
            right.remove(targets, i);

            let next = sorted[pos + 1].0;
            if next == value {
                continue;
            }
            if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                continue;
            }

            let gain = self.split_gain(parent, &left, &right);
            if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: split_threshold(value, next),
                    gain,
                });
            }
        }

        best
    }

    fn leaf_for(&self, row: ArrayView1<f64>) -> Result<&[f64]> {
        let mut node_id = 0;
        loop {
            match self.nodes.get(node_id) {
                Some(TreeNode::Leaf { values, .. }) => return Ok(values),
                Some(TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                }) => {
                    node_id = if row[*feature_idx] <= *threshold { *left } else { *right };
                }
                None => return Err(SuperstoreError::ModelNotFitted),
            }
        }
    }

    fn check_input(&self, x: ArrayView2<f64>) -> Result<()> {
        if !self.is_fitted() {
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

    /// Class probabilities, one column per entry of [`classes`](Self::classes)
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        if !self.is_classifier() {
            return Err(SuperstoreError::TrainingError(
                "predict_proba requires a classification tree".to_string(),
            ));
        }

        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            let values = self.leaf_for(row)?;
            for (j, p) in values.iter().enumerate() {
                proba[[i, j]] = *p;
            }
        }
        Ok(proba)
    }

    /// Predict targets; classification returns the most probable class
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(x.view())?;
        let mut predictions = Array1::zeros(x.nrows());
        for (i, row) in x.rows().into_iter().enumerate() {
            let values = self.leaf_for(row)?;
            predictions[i] = if self.is_classifier() {
                self.classes[argmax(values)]
            } else {
                values[0]
            };
        }
        Ok(predictions)
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node_id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(TreeNode::Split { left, right, .. }) = self.nodes.get(node_id) {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}

/// Index of the largest value; ties resolve to the lowest index
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Distinct values of a feature within a node
#[derive(Debug, Clone, Copy, PartialEq)]
enum ValueProfile {
    /// One distinct value (all NaN counts as one value)
    Constant,
    /// Exactly two observed values, no NaN; one-hot indicators land here
    TwoValued { low: f64, high: f64 },
    Many,
}

fn value_profile(x: ArrayView2<f64>, feature_idx: usize, indices: &[usize]) -> ValueProfile {
    let mut values = indices.iter().map(|&i| x[[i, feature_idx]]);
    let Some(first) = values.next() else {
        return ValueProfile::Constant;
    };
    if first.is_nan() {
        return if values.all(f64::is_nan) {
            ValueProfile::Constant
        } else {
            ValueProfile::Many
        };
    }

    let mut second: Option<f64> = None;
    for v in values {
        if v == first {
            continue;
        }
        match second {
            _ if v.is_nan() => return ValueProfile::Many,
            None => second = Some(v),
            Some(s) if s == v => {}
            Some(_) => return ValueProfile::Many,
        }
    }

    match second {
        None => ValueProfile::Constant,
        Some(s) => ValueProfile::TwoValued {
            low: first.min(s),
            high: first.max(s),
        },
    }
}

fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

// Midpoint between adjacent distinct values. When the next value is NaN the
// split separates observed values from missing ones.
fn split_threshold(value: f64, next: f64) -> f64 {
    if next.is_nan() {
        return value;
    }
    let mid = value / 2.0 + next / 2.0;
    if mid >= next || !mid.is_finite() {
        value
    } else {
        mid
    }
}
