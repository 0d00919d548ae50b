//! Seeded train/evaluation partitioning

use crate::error::{Result, SuperstoreError};
use crate::preprocessing::FeatureSet;
use ndarray::{Array1, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cmp::Ordering;

/// Row indices of the two partitions, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Evaluation partition size: `ceil(test_size * n)`, leaving at least one
/// record on each side.
pub fn test_count(n_samples: usize, test_size: f64) -> usize {
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    n_test.clamp(1, n_samples.saturating_sub(1).max(1))
}

fn check_inputs(n_samples: usize, test_size: f64) -> Result<()> {
    if n_samples < 2 {
        return Err(SuperstoreError::ValidationError(format!(
            "need at least 2 records to split, got {}",
            n_samples
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SuperstoreError::ConfigError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    Ok(())
}

/// Random split of `n_samples` rows
pub fn train_test_split(n_samples: usize, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    check_inputs(n_samples, test_size)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut rng);

    let n_test = test_count(n_samples, test_size);
    let mut test = indices[..n_test].to_vec();
    let mut train = indices[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

/// Split preserving the class proportions of `y` in both partitions
///
/// Each class receives the floor of its proportional share of the
/// evaluation partition; the leftover slots go to the classes with the
/// largest fractional remainders (lower label first on ties).
pub fn stratified_split(y: &Array1<f64>, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    let n_samples = y.len();
    check_inputs(n_samples, test_size)?;

    let mut classes: Vec<f64> = y.to_vec();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    classes.dedup();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
    for (i, v) in y.iter().enumerate() {
        let class = classes.partition_point(|c| c < v);
        members[class].push(i);
    }

    let n_test = test_count(n_samples, test_size);
    let exact: Vec<f64> = members
        .iter()
        .map(|m| n_test as f64 * m.len() as f64 / n_samples as f64)
        .collect();
    let mut allocation: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut by_remainder: Vec<usize> = (0..classes.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(Ordering::Equal).then(a.cmp(&b))
    });

    let mut remaining = n_test.saturating_sub(allocation.iter().sum());
    for &class in by_remainder.iter().cycle().take(classes.len() * 2) {
        if remaining == 0 {
            break;
        }
        if allocation[class] < members[class].len() {
            allocation[class] += 1;
            remaining -= 1;
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_samples - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (rows, &n_class_test) in members.iter_mut().zip(&allocation) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..n_class_test]);
        train.extend_from_slice(&rows[n_class_test..]);
    }

    test.sort_unstable();
    train.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

/// Rows of a feature set at `indices`
pub fn take_rows(features: &FeatureSet, indices: &[usize]) -> Result<(DataFrame, Array1<f64>)> {
    let idx = IdxCa::from_vec("idx".into(), indices.iter().map(|&i| i as IdxSize).collect());
    let x = features.x.take(&idx)?;
    let y = features.y.select(Axis(0), indices);
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(101, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 21);
        assert_eq!(split.train.len(), 80);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(
            train_test_split(50, 0.2, 42).unwrap(),
            train_test_split(50, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_split(50, 0.2, 42).unwrap(),
            train_test_split(50, 0.2, 43).unwrap()
        );
    }

    #[test]
    fn test_stratified_preserves_proportions() {
        let y: Array1<f64> = (0..100).map(|i| if i < 60 { 1.0 } else { 0.0 }).collect();
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        let positives = split.test.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(positives, 12);
    }

    #[test]
    fn test_stratified_single_class() {
        let y = Array1::from_elem(10, 0.0);
        let split = stratified_split(&y, 0.2, 1).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn test_too_few_records() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(stratified_split(&Array1::from_elem(1, 1.0), 0.2, 42).is_err());
    }
}
