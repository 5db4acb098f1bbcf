use super::grid_search::{CandidateScore, GridSearch, GridSearchResult};
use super::knn::{Estimator, KnnClassifier, KnnRegressor};
use crate::config::PipelineConfig;
use crate::error::{ForecastError, Result};
use crate::evaluation::{self, select_rows, select_values, train_test_split, ConfusionMatrix};
use crate::features::FeatureSet;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelComparison {
    pub actual: i32,
    pub predicted: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloseComparison {
    pub actual: f64,
    pub predicted: f64,
}

/// Result of the next-day direction model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub best_k: usize,
    pub cv_results: Vec<CandidateScore>,
    pub skipped_k: Vec<usize>,
    pub train_size: usize,
    pub test_size: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub confusion: ConfusionMatrix,
    /// Test rows in chronological order.
    pub comparisons: Vec<LabelComparison>,
}

/// Result of the close-price model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionOutcome {
    pub best_k: usize,
    pub cv_results: Vec<CandidateScore>,
    pub skipped_k: Vec<usize>,
    pub train_size: usize,
    pub test_size: usize,
    pub test_rmse: f64,
    pub test_mae: f64,
    pub test_r2: f64,
    /// Test rows in chronological order.
    pub comparisons: Vec<CloseComparison>,
}

impl RegressionOutcome {
    pub fn actual(&self) -> Vec<f64> {
        self.comparisons.iter().map(|c| c.actual).collect()
    }

    pub fn predicted(&self) -> Vec<f64> {
        self.comparisons.iter().map(|c| c.predicted).collect()
    }
}

struct HoldOut<T> {
    x_train: Array2<f64>,
    y_train: Array1<T>,
    x_test: Array2<f64>,
    y_test: Array1<T>,
}

fn hold_out<T: Clone>(x: &Array2<f64>, y: &Array1<T>, config: &PipelineConfig) -> Result<HoldOut<T>> {
    let split = train_test_split(y.len(), &config.split)?;
    Ok(HoldOut {
        x_train: select_rows(x, &split.train),
        y_train: select_values(y, &split.train),
        x_test: select_rows(x, &split.test),
        y_test: select_values(y, &split.test),
    })
}

fn tune<E: Estimator>(
    template: E,
    data: &HoldOut<E::Target>,
    config: &PipelineConfig,
) -> Result<GridSearchResult<E>> {
    GridSearch::from_config(template, &config.grid)?.fit(&data.x_train, &data.y_train)
}

/// Fit the up/down classifier on every labeled row (the final day is never
/// labeled) and score it on the chronological hold-out. Returns the tuned
/// model, fitted on the training rows, with its outcome.
pub fn train_direction_classifier(
    features: &FeatureSet,
    config: &PipelineConfig,
) -> Result<(KnnClassifier, ClassificationOutcome)> {
    let y = features.labels.clone();
    if y.len() < 2 {
        return Err(ForecastError::InsufficientSamples {
            needed: 2,
            available: y.len(),
        });
    }
    let x = features.classification_matrix().to_owned();
    let data = hold_out(&x, &y, config)?;

    let template = KnnClassifier::new(config.grid.k_min)
        .with_weighting(config.model.weighting)
        .with_metric(config.model.metric);
    let search = tune(template, &data, config)?;
    let model = search.best_estimator;

    let train_pred = model.predict(data.x_train.view())?;
    let test_pred = model.predict(data.x_test.view())?;
    let train_accuracy = evaluation::accuracy(&data.y_train, &train_pred)?;
    let test_accuracy = evaluation::accuracy(&data.y_test, &test_pred)?;
    let confusion = ConfusionMatrix::from_labels(&data.y_test, &test_pred)?;

    info!(
        k = search.best_k,
        train_accuracy, test_accuracy, "direction classifier trained"
    );

    let outcome = ClassificationOutcome {
        best_k: search.best_k,
        cv_results: search.candidates,
        skipped_k: search.skipped,
        train_size: data.y_train.len(),
        test_size: data.y_test.len(),
        train_accuracy,
        test_accuracy,
        confusion,
        comparisons: data
            .y_test
            .iter()
            .zip(test_pred.iter())
            .map(|(&actual, &predicted)| LabelComparison { actual, predicted })
            .collect(),
    };
    Ok((model, outcome))
}

/// Fit the close-price regressor on every row and score it on the
/// chronological hold-out. Returns the tuned model with its outcome.
pub fn train_close_regressor(
    features: &FeatureSet,
    config: &PipelineConfig,
) -> Result<(KnnRegressor, RegressionOutcome)> {
    let data = hold_out(&features.x, &features.close, config)?;

    let template = KnnRegressor::new(config.grid.k_min)
        .with_weighting(config.model.weighting)
        .with_metric(config.model.metric);
    let search = tune(template, &data, config)?;

    let model = search.best_estimator;
    let test_pred = model.predict(data.x_test.view())?;
    let test_rmse = evaluation::rmse(&data.y_test, &test_pred)?;
    let test_mae = evaluation::mae(&data.y_test, &test_pred)?;
    let test_r2 = evaluation::r2_score(&data.y_test, &test_pred)?;

    info!(k = search.best_k, test_rmse, "close regressor trained");

    let outcome = RegressionOutcome {
        best_k: search.best_k,
        cv_results: search.candidates,
        skipped_k: search.skipped,
        train_size: data.y_train.len(),
        test_size: data.y_test.len(),
        test_rmse,
        test_mae,
        test_r2,
        comparisons: data
            .y_test
            .iter()
            .zip(test_pred.iter())
            .map(|(&actual, &predicted)| CloseComparison { actual, predicted })
            .collect(),
    };
    Ok((model, outcome))
}
