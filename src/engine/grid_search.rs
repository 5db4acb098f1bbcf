use super::knn::{neighbor_table, Estimator, Neighbor};
use crate::config::GridConfig;
use crate::error::{ForecastError, Result};
use crate::evaluation::{select_rows, select_values};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info, warn};

/// Cross-validated score of one neighbor count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub k: usize,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    /// Population standard deviation across folds.
    pub std_score: f64,
    /// 1 = best. Equal means share a rank.
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct GridSearchResult<E> {
    /// Best candidate refit on every training row.
    pub best_estimator: E,
    pub best_k: usize,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
    /// Neighbor counts larger than the smallest fold's training set.
    pub skipped: Vec<usize>,
}

struct Fold<T> {
    table: Vec<Vec<Neighbor>>,
    y_train: Array1<T>,
    y_test: Array1<T>,
}

/// Exhaustive search over neighbor counts, scored by k-fold cross-validation.
#[derive(Debug, Clone)]
pub struct GridSearch<E> {
    template: E,
    grid: Vec<usize>,
    folds: usize,
}

impl<E: Estimator> GridSearch<E> {
    /// `template` supplies weighting and metric; its own `k` is ignored.
    pub fn new(template: E, grid: Vec<usize>, folds: usize) -> Result<Self> {
        if grid.is_empty() {
            return Err(ForecastError::InvalidGrid("no neighbor counts to search".into()));
        }
        if grid.contains(&0) {
            return Err(ForecastError::InvalidGrid("neighbor count 0 is not allowed".into()));
        }
        Ok(Self {
            template,
            grid,
            folds,
        })
    }

    pub fn from_config(template: E, config: &GridConfig) -> Result<Self> {
        if config.k_min > config.k_max {
            return Err(ForecastError::InvalidGrid(format!(
                "k_min {} exceeds k_max {}",
                config.k_min, config.k_max
            )));
        }
        Self::new(template, config.candidates(), config.folds)
    }

    pub fn fit(&self, x: &Array2<f64>, y: &Array1<E::Target>) -> Result<GridSearchResult<E>> {
        if x.nrows() != y.len() {
            return Err(ForecastError::LengthMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }

        self.template.metric().validate()?;

        let splits = E::cv_splits(y, self.folds)?;
        let largest_k_allowed = splits.iter().map(|s| s.train.len()).min().unwrap_or(0);
        let (feasible, skipped): (Vec<usize>, Vec<usize>) =
            self.grid.iter().partition(|&&k| k <= largest_k_allowed);
        for &k in &skipped {
            warn!(k, largest_k_allowed, "neighbor count exceeds fold training size, skipped");
        }
        let deepest = feasible.iter().copied().max().unwrap_or(0);

        // Neighbor lists do not depend on k: find them once per fold, as deep
        // as the largest feasible k, and score every k from their prefixes.
        let folds: Vec<Fold<E::Target>> = splits
            .iter()
            .map(|split| {
                let x_train = select_rows(x, &split.train);
                let x_test = select_rows(x, &split.test);
                Fold {
                    table: neighbor_table(&x_train, x_test.view(), deepest, self.template.metric()),
                    y_train: select_values(y, &split.train),
                    y_test: select_values(y, &split.test),
                }
            })
            .collect();

        let mut candidates = Vec::with_capacity(feasible.len());
        for &k in &feasible {
            let model = self.template.with_neighbors(k);
            let fold_scores = folds
                .iter()
                .map(|fold| {
                    let predicted = model.predict_from_neighbors(&fold.table, &fold.y_train);
                    E::score(&fold.y_test, &predicted)
                })
                .collect::<Result<Vec<f64>>>()?;

            let mean_score = fold_scores.iter().copied().mean();
            let std_score = fold_scores.iter().copied().population_std_dev();
            debug!(k, mean_score, std_score, "cross-validated candidate");

            candidates.push(CandidateScore {
                k,
                fold_scores,
                mean_score,
                std_score,
                rank: 0,
            });
        }

        if candidates.is_empty() {
            return Err(ForecastError::NoFeasibleCandidate { largest_k_allowed });
        }

        let means: Vec<f64> = candidates.iter().map(|c| c.mean_score).collect();
        for c in candidates.iter_mut() {
            c.rank = 1 + means.iter().filter(|&&m| m > c.mean_score).count();
        }

        // First rank-1 candidate in grid order, i.e. the smallest tied k.
        let best = candidates
            .iter()
            .find(|c| c.rank == 1)
            .ok_or(ForecastError::NoFeasibleCandidate { largest_k_allowed })?;
        let best_k = best.k;
        let best_score = best.mean_score;

        let mut best_estimator = self.template.with_neighbors(best_k);
        best_estimator.fit(x, y)?;

        info!(best_k, best_score, folds = self.folds, "grid search complete");

        Ok(GridSearchResult {
            best_estimator,
            best_k,
            best_score,
            candidates,
            skipped,
        })
    }
}
