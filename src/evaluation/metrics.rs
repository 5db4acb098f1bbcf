//! Classification and regression scores for the KNN models.

use crate::error::{ForecastError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

fn check_lengths<A, B>(y_true: &Array1<A>, y_pred: &Array1<B>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(ForecastError::LengthMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    Ok(())
}

/// Fraction of exact label matches. Empty input scores 0.
pub fn accuracy<T: PartialEq>(y_true: &Array1<T>, y_pred: &Array1<T>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Ok(0.0);
    }
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

pub fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Ok(0.0);
    }
    Ok(y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64)
}

/// Root mean squared error; zero only when every prediction is exact.
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

pub fn mae(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Ok(0.0);
    }
    Ok(y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64)
}

/// Coefficient of determination. A constant target scores 0.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Ok(0.0);
    }
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Two-class confusion counts with +1 (up) as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_up: usize,
    pub false_up: usize,
    pub false_down: usize,
    pub true_down: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &Array1<i32>, y_pred: &Array1<i32>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let mut m = ConfusionMatrix::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t > 0, p > 0) {
                (true, true) => m.true_up += 1,
                (false, true) => m.false_up += 1,
                (true, false) => m.false_down += 1,
                (false, false) => m.true_down += 1,
            }
        }
        Ok(m)
    }

    pub fn total(&self) -> usize {
        self.true_up + self.false_up + self.false_down + self.true_down
    }

    pub fn precision_up(&self) -> f64 {
        let predicted = self.true_up + self.false_up;
        if predicted == 0 {
            0.0
        } else {
            self.true_up as f64 / predicted as f64
        }
    }

    pub fn recall_up(&self) -> f64 {
        let actual = self.true_up + self.false_down;
        if actual == 0 {
            0.0
        } else {
            self.true_up as f64 / actual as f64
        }
    }
}
