//! Linear model implementations
//!
//! Alternate estimators to the forest. Both standardise their inputs with
//! statistics learned at fit time and substitute the training mean for NaN,
//! so raw pass-through columns with very different scales (postal code next
//! to a discount fraction) and leftover missing values are safe to feed in.

use crate::error::{Result, SuperstoreError};
use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Per-column mean/scale learned from training data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Standardizer {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl Standardizer {
    /// Learn statistics, ignoring NaN entries
    pub fn fit(x: &Array2<f64>) -> Self {
        let n_features = x.ncols();
        let mut means = Array1::zeros(n_features);
        let mut scales = Array1::ones(n_features);

        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                continue;
            }
            let n = observed.len() as f64;
            let mean = observed.iter().sum::<f64>() / n;
            let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            means[j] = mean;
            if var.sqrt() > 1e-12 {
                scales[j] = var.sqrt();
            }
        }

        Self { means, scales }
    }

    /// Standardise; NaN becomes the column mean (0 after scaling)
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.means.len() {
            return Err(SuperstoreError::ShapeError {
                expected: format!("{} features", self.means.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = x.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            Zip::from(&mut row)
                .and(&self.means)
                .and(&self.scales)
                .for_each(|v, &mean, &scale| {
                    *v = if v.is_nan() { 0.0 } else { (*v - mean) / scale };
                });
        }
        Ok(out)
    }
}

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Adds a growing diagonal jitter when the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    if n == 0 {
        return Some(Array1::zeros(0));
    }

    let base = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
    let mut jitter = 1e-10 * base.max(1.0);

    for _ in 0..8 {
        if let Some(l) = cholesky_factor(a, jitter) {
            return Some(cholesky_substitute(&l, b));
        }
        jitter *= 100.0;
    }
    None
}

fn cholesky_factor(a: &Array2<f64>, jitter: f64) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] + jitter - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

fn cholesky_substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients on standardised inputs
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: Option<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    standardizer: Option<Standardizer>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.0,
            standardizer: None,
        }
    }

    /// Set regularization strength (Ridge regression)
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Fit the model to training data
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
                "cannot fit on zero samples".to_string(),
            ));
        }

        let standardizer = Standardizer::fit(x);
        let x_std = standardizer.transform(x)?;
        let y_mean = y.mean().unwrap_or(0.0);
        let y_centered = y - y_mean;

        // Solve normal equations: (X^T X + alpha*I) * w = X^T y
        let mut xtx = x_std.t().dot(&x_std);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_std.t().dot(&y_centered);

        let coefficients = cholesky_solve(&xtx, &xty).ok_or_else(|| {
            SuperstoreError::TrainingError("normal equations are singular".to_string())
        })?;

        self.coefficients = Some(coefficients);
        // Standardised columns are centred, so the intercept is the target mean
        self.intercept = Some(y_mean);
        self.standardizer = Some(standardizer);
        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (Some(coefficients), Some(standardizer)) = (&self.coefficients, &self.standardizer) else {
            return Err(SuperstoreError::ModelNotFitted);
        };
        let intercept = self.intercept.unwrap_or(0.0);

        let x_std = standardizer.transform(x)?;
        Ok(x_std.dot(coefficients) + intercept)
    }
}

/// Logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients on standardised inputs
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Inverse L2 regularization strength
    pub c: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    standardizer: Option<Standardizer>,
    /// Sorted labels seen during fit; the second is the positive class
    classes: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            max_iter: 500,
            tol: 1e-6,
            learning_rate: 0.1,
            standardizer: None,
            classes: Vec::new(),
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Sigmoid function
    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit the model using gradient descent
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(SuperstoreError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup();
        if classes.is_empty() || classes.len() > 2 {
            return Err(SuperstoreError::TrainingError(format!(
                "logistic regression needs one or two classes, got {}",
                classes.len()
            )));
        }

        let standardizer = Standardizer::fit(x);
        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        // A single training class has nothing to separate
        if classes.len() == 2 {
            let x_std = standardizer.transform(x)?;
            let positive = classes[1];
            let targets = y.mapv(|v| if v == positive { 1.0 } else { 0.0 });

            let lr = self.learning_rate;
            let alpha = 1.0 / (self.c * n_samples as f64);

            for _iter in 0..self.max_iter {
                let linear = x_std.dot(&weights) + bias;
                let predictions = Self::sigmoid(&linear);

                let errors = &predictions - &targets;
                let dw = (x_std.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
                let db = errors.mean().unwrap_or(0.0);

                let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
                if grad_norm < self.tol {
                    break;
                }

                weights = weights - lr * dw;
                bias -= lr * db;
            }
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.standardizer = Some(standardizer);
        self.classes = classes;
        Ok(self)
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (Some(coefficients), Some(standardizer)) = (&self.coefficients, &self.standardizer) else {
            return Err(SuperstoreError::ModelNotFitted);
        };

        if self.classes.len() == 1 {
            return Ok(Array1::ones(x.nrows()));
        }

        let intercept = self.intercept.unwrap_or(0.0);
        let x_std = standardizer.transform(x)?;
        Ok(Self::sigmoid(&(x_std.dot(coefficients) + intercept)))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let negative = self.classes[0];
        let positive = *self.classes.last().unwrap_or(&negative);
        Ok(proba.mapv(|p| if p > 0.5 { positive } else { negative }))
    }
}
