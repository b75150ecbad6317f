//! Ridge-regularised linear regression over standardized features

use super::features::NUM_FEATURES;
use super::training::TrainingSample;
use crate::error::{QueueError, Result};
use serde::{Deserialize, Serialize};

/// Pivot magnitude below which the normal equations are treated as singular
const SINGULAR_EPSILON: f64 = 1e-12;

/// In-sample fit quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub mae: f64,
    pub rmse: f64,
}

/// Linear wait-time model. Inputs are standardized with the training
/// means and scales before the dot product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWaitModel {
    intercept: f64,
    weights: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl LinearWaitModel {
    /// Fit on the full sample set by solving `(ZᵀZ + λI) w = Zᵀ(y - ȳ)`
    pub fn fit(samples: &[TrainingSample], ridge: f64) -> Result<Self> {
        if samples.is_empty() {
            return Err(QueueError::Model("cannot fit on zero samples".to_string()));
        }
        let ridge = ridge.max(0.0);
        let n = samples.len() as f64;
        let rows: Vec<[f64; NUM_FEATURES]> = samples.iter().map(|s| s.features.to_array()).collect();

        let mut means = vec![0.0; NUM_FEATURES];
        for row in &rows {
            for (m, x) in means.iter_mut().zip(row.iter()) {
                *m += x / n;
            }
        }

        let mut scales = vec![0.0; NUM_FEATURES];
        for row in &rows {
            for j in 0..NUM_FEATURES {
                scales[j] += (row[j] - means[j]).powi(2) / n;
            }
        }
        for s in scales.iter_mut() {
            *s = s.sqrt();
            if *s < f64::EPSILON {
                *s = 1.0;
            }
        }

        let y_mean = samples.iter().map(|s| s.actual_wait_minutes).sum::<f64>() / n;

        // Normal equations on standardized inputs
        let mut a = vec![vec![0.0; NUM_FEATURES]; NUM_FEATURES];
        let mut b = vec![0.0; NUM_FEATURES];
        for (row, sample) in rows.iter().zip(samples) {
            let z: Vec<f64> = (0..NUM_FEATURES)
                .map(|j| (row[j] - means[j]) / scales[j])
                .collect();
            let dy = sample.actual_wait_minutes - y_mean;
            for i in 0..NUM_FEATURES {
                b[i] += z[i] * dy;
                for j in 0..NUM_FEATURES {
                    a[i][j] += z[i] * z[j];
                }
            }
        }
        for (i, row) in a.iter_mut().enumerate() {
            row[i] += ridge;
        }

        let weights = solve(a, b)?;

        Ok(Self {
            intercept: y_mean,
            weights,
            means,
            scales,
        })
    }

    /// Unclamped model output in minutes
    pub fn predict_raw(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        assert_eq!(
            self.weights.len(),
            NUM_FEATURES,
            "model width does not match feature width"
        );
        features
            .iter()
            .zip(self.weights.iter())
            .zip(self.means.iter().zip(self.scales.iter()))
            .fold(self.intercept, |acc, ((x, w), (m, s))| acc + w * (x - m) / s)
    }

    /// Reject models whose shape does not match the feature vector
    pub fn validate(&self) -> Result<()> {
        let widths = [self.weights.len(), self.means.len(), self.scales.len()];
        if widths.iter().any(|&w| w != NUM_FEATURES) {
            return Err(QueueError::Model(format!(
                "model has widths {:?}, expected {}",
                widths, NUM_FEATURES
            )));
        }
        let finite = std::iter::once(&self.intercept)
            .chain(self.weights.iter())
            .chain(self.means.iter())
            .chain(self.scales.iter())
            .all(|v| v.is_finite());
        if !finite || self.scales.iter().any(|s| *s == 0.0) {
            return Err(QueueError::Model("model has non-finite parameters".to_string()));
        }
        Ok(())
    }

    /// Mean absolute and root-mean-square error on `samples`
    pub fn evaluate(&self, samples: &[TrainingSample]) -> FitMetrics {
        if samples.is_empty() {
            return FitMetrics { mae: 0.0, rmse: 0.0 };
        }
        let n = samples.len() as f64;
        let (abs_sum, sq_sum) = samples.iter().fold((0.0, 0.0), |(abs, sq), s| {
            let err = self.predict_raw(&s.features.to_array()) - s.actual_wait_minutes;
            (abs + err.abs(), sq + err * err)
        });
        FitMetrics {
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
        }
    }
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot][col].abs() < SINGULAR_EPSILON {
            return Err(QueueError::Model("normal equations are singular".to_string()));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
