//! K-nearest-neighbor classifier and regressor over dense feature rows.

use crate::error::{ForecastError, Result};
use crate::evaluation::{self, CvSplit};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Training row and its distance to a query.
pub type Neighbor = (usize, f64);

/// How neighbors contribute to a prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    /// Every neighbor counts once.
    #[default]
    Uniform,
    /// Neighbors count by inverse distance. Exact matches, when present,
    /// take all of the weight.
    Distance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// L2
    #[default]
    Euclidean,
    /// L1
    Manhattan,
    Minkowski(f64),
}

impl DistanceMetric {
    /// Minkowski distance of power `p`; only `p >= 1` is a metric.
    pub fn minkowski(p: f64) -> Result<Self> {
        let metric = DistanceMetric::Minkowski(p);
        metric.validate()?;
        Ok(metric)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            DistanceMetric::Minkowski(p) if !(p >= 1.0 && p.is_finite()) => Err(
                ForecastError::InvalidMetric(format!("Minkowski power must be a finite p >= 1, got {}", p)),
            ),
            _ => Ok(()),
        }
    }

    pub fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match *self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Minkowski(p) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).abs().powf(p))
                .sum::<f64>()
                .powf(1.0 / p),
        }
    }
}

/// Closer first; equal distances keep the earlier training row first.
fn by_distance(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// The `k` training rows closest to `query`, nearest first.
pub fn nearest_rows(
    train: &Array2<f64>,
    query: ArrayView1<'_, f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<Neighbor> {
    let mut distances: Vec<Neighbor> = train
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| (i, metric.distance(query, row)))
        .collect();
    let k = k.min(distances.len());
    if k == 0 {
        return Vec::new();
    }
    if k < distances.len() {
        distances.select_nth_unstable_by(k - 1, by_distance);
        distances.truncate(k);
    }
    distances.sort_by(by_distance);
    distances
}

/// Nearest-first neighbor lists for every query row. Any `k` up to the one
/// given here can be answered from a prefix of each list.
pub fn neighbor_table(
    train: &Array2<f64>,
    queries: ArrayView2<'_, f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<Vec<Neighbor>> {
    queries
        .rows()
        .into_iter()
        .map(|query| nearest_rows(train, query, k, metric))
        .collect()
}

/// Common surface of the neighbor models, used by the grid search.
pub trait Estimator: Sized {
    type Target: Clone + std::fmt::Debug;

    /// Unfitted copy with the same weighting and metric but `k` neighbors.
    fn with_neighbors(&self, k: usize) -> Self;

    fn neighbors(&self) -> usize;

    fn metric(&self) -> DistanceMetric;

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<Self::Target>) -> Result<()>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<Self::Target>>;

    /// Predict from precomputed nearest-first lists; only the first `k`
    /// entries of each list are used.
    fn predict_from_neighbors(
        &self,
        table: &[Vec<Neighbor>],
        y_train: &Array1<Self::Target>,
    ) -> Array1<Self::Target>;

    /// Higher is better.
    fn score(y_true: &Array1<Self::Target>, y_pred: &Array1<Self::Target>) -> Result<f64>;

    /// Fold layout used when this model is cross-validated.
    fn cv_splits(y: &Array1<Self::Target>, folds: usize) -> Result<Vec<CvSplit>>;
}

/// Stored training rows with brute-force neighbor lookup.
#[derive(Debug, Clone)]
struct NeighborIndex<T> {
    x: Array2<f64>,
    y: Array1<T>,
}

impl<T: Clone> NeighborIndex<T> {
    fn build(x: &Array2<f64>, y: &Array1<T>, k: usize, metric: DistanceMetric) -> Result<Self> {
        metric.validate()?;
        if x.nrows() != y.len() {
            return Err(ForecastError::LengthMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if k == 0 {
            return Err(ForecastError::InvalidGrid("k must be at least 1".into()));
        }
        if k > x.nrows() {
            return Err(ForecastError::InsufficientSamples {
                needed: k,
                available: x.nrows(),
            });
        }
        Ok(Self {
            x: x.clone(),
            y: y.clone(),
        })
    }

    fn check_width(&self, x: &ArrayView2<'_, f64>) -> Result<()> {
        if self.x.ncols() != x.ncols() {
            return Err(ForecastError::LengthMismatch {
                expected: self.x.ncols(),
                actual: x.ncols(),
            });
        }
        Ok(())
    }
}

fn first_k(list: &[Neighbor], k: usize) -> &[Neighbor] {
    &list[..k.min(list.len())]
}

fn neighbor_weights(neighbors: &[Neighbor], weighting: Weighting) -> Vec<f64> {
    match weighting {
        Weighting::Uniform => vec![1.0; neighbors.len()],
        Weighting::Distance => {
            if neighbors.iter().any(|(_, d)| *d == 0.0) {
                neighbors
                    .iter()
                    .map(|(_, d)| if *d == 0.0 { 1.0 } else { 0.0 })
                    .collect()
            } else {
                neighbors.iter().map(|(_, d)| 1.0 / d).collect()
            }
        }
    }
}

/// Majority-vote neighbor classifier over integer labels.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    weighting: Weighting,
    metric: DistanceMetric,
    index: Option<NeighborIndex<i32>>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            weighting: Weighting::default(),
            metric: DistanceMetric::default(),
            index: None,
        }
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Weighted vote; a tie goes to the smallest label.
    fn vote(&self, neighbors: &[Neighbor], labels: &Array1<i32>) -> i32 {
        let weights = neighbor_weights(neighbors, self.weighting);
        let mut tally: BTreeMap<i32, f64> = BTreeMap::new();
        for ((row, _), w) in neighbors.iter().zip(weights) {
            *tally.entry(labels[*row]).or_insert(0.0) += w;
        }

        let mut best: Option<(i32, f64)> = None;
        for (label, weight) in tally {
            match best {
                Some((_, best_weight)) if weight <= best_weight => {}
                _ => best = Some((label, weight)),
            }
        }
        best.map(|(label, _)| label).unwrap_or_default()
    }
}

impl Estimator for KnnClassifier {
    type Target = i32;

    fn with_neighbors(&self, k: usize) -> Self {
        Self::new(k).with_weighting(self.weighting).with_metric(self.metric)
    }

    fn neighbors(&self) -> usize {
        self.k
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i32>) -> Result<()> {
        self.index = Some(NeighborIndex::build(x, y, self.k, self.metric)?);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<i32>> {
        let index = self.index.as_ref().ok_or(ForecastError::NotFitted)?;
        index.check_width(&x)?;
        let table = neighbor_table(&index.x, x, self.k, self.metric);
        Ok(self.predict_from_neighbors(&table, &index.y))
    }

    fn predict_from_neighbors(&self, table: &[Vec<Neighbor>], y_train: &Array1<i32>) -> Array1<i32> {
        table
            .iter()
            .map(|list| self.vote(first_k(list, self.k), y_train))
            .collect()
    }

    fn score(y_true: &Array1<i32>, y_pred: &Array1<i32>) -> Result<f64> {
        evaluation::accuracy(y_true, y_pred)
    }

    fn cv_splits(y: &Array1<i32>, folds: usize) -> Result<Vec<CvSplit>> {
        let labels: Vec<i32> = y.to_vec();
        evaluation::stratified_k_fold(&labels, folds)
    }
}

/// Neighbor-average regressor.
#[derive(Debug, Clone)]
pub struct KnnRegressor {
    k: usize,
    weighting: Weighting,
    metric: DistanceMetric,
    index: Option<NeighborIndex<f64>>,
}

impl KnnRegressor {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            weighting: Weighting::default(),
            metric: DistanceMetric::default(),
            index: None,
        }
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    fn average(&self, neighbors: &[Neighbor], targets: &Array1<f64>) -> f64 {
        let weights = neighbor_weights(neighbors, self.weighting);
        let w_sum: f64 = weights.iter().sum();
        neighbors
            .iter()
            .zip(&weights)
            .map(|((i, _), w)| targets[*i] * w)
            .sum::<f64>()
            / w_sum
    }
}

impl Estimator for KnnRegressor {
    type Target = f64;

    fn with_neighbors(&self, k: usize) -> Self {
        Self::new(k).with_weighting(self.weighting).with_metric(self.metric)
    }

    fn neighbors(&self) -> usize {
        self.k
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.index = Some(NeighborIndex::build(x, y, self.k, self.metric)?);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let index = self.index.as_ref().ok_or(ForecastError::NotFitted)?;
        index.check_width(&x)?;
        let table = neighbor_table(&index.x, x, self.k, self.metric);
        Ok(self.predict_from_neighbors(&table, &index.y))
    }

    fn predict_from_neighbors(&self, table: &[Vec<Neighbor>], y_train: &Array1<f64>) -> Array1<f64> {
        table
            .iter()
            .map(|list| self.average(first_k(list, self.k), y_train))
            .collect()
    }

    /// Negative mean squared error, so that larger is better.
    fn score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        Ok(-evaluation::mse(y_true, y_pred)?)
    }

    fn cv_splits(y: &Array1<f64>, folds: usize) -> Result<Vec<CvSplit>> {
        evaluation::k_fold(y.len(), folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clusters() -> (Array2<f64>, Array1<i32>) {
        let x = array![
            [1.0, 1.0],
            [1.0, 2.0],
            [2.0, 1.0],
            [5.0, 5.0],
            [5.0, 6.0],
            [6.0, 5.0]
        ];
        let y = array![-1, -1, -1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_classifier_separates_clusters() {
        let (x, y) = clusters();
        let mut knn = KnnClassifier::new(3);
        knn.fit(&x, &y).unwrap();
        let preds = knn.predict(array![[1.5, 1.5], [5.5, 5.5]].view()).unwrap();
        assert_eq!(preds, array![-1, 1]);
    }

    #[test]
    fn test_classifier_tie_goes_to_smallest_label() {
        let x = array![[0.0], [1.0], [10.0]];
        let y = array![1, -1, 1];
        let mut knn = KnnClassifier::new(2);
        knn.fit(&x, &y).unwrap();
        // Neighbors of 0.4 are rows 0 (+1) and 1 (-1): a 1-1 tie.
        let preds = knn.predict(array![[0.4]].view()).unwrap();
        assert_eq!(preds[0], -1);
    }

    #[test]
    fn test_classifier_distance_weighting_breaks_tie() {
        let x = array![[0.0], [1.0], [10.0]];
        let y = array![1, -1, 1];
        let mut knn = KnnClassifier::new(2).with_weighting(Weighting::Distance);
        knn.fit(&x, &y).unwrap();
        let preds = knn.predict(array![[0.2]].view()).unwrap();
        assert_eq!(preds[0], 1);
    }

    #[test]
    fn test_regressor_uniform_mean() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0];
        let mut knn = KnnRegressor::new(2);
        knn.fit(&x, &y).unwrap();
        let preds = knn.predict(array![[2.5], [3.5]].view()).unwrap();
        assert!((preds[0] - 5.0).abs() < 1e-10);
        assert!((preds[1] - 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_regressor_distance_weighting() {
        let x = array![[0.0], [3.0]];
        let y = array![10.0, 40.0];
        let mut knn = KnnRegressor::new(2).with_weighting(Weighting::Distance);
        knn.fit(&x, &y).unwrap();
        // weights 1/1 and 1/2 -> (10 + 20) / 1.5 = 20
        let preds = knn.predict(array![[1.0]].view()).unwrap();
        assert!((preds[0] - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_regressor_exact_match_takes_all_weight() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![5.0, 7.0, 9.0];
        let mut knn = KnnRegressor::new(3).with_weighting(Weighting::Distance);
        knn.fit(&x, &y).unwrap();
        let preds = knn.predict(array![[1.0]].view()).unwrap();
        assert!((preds[0] - 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_equal_distances_prefer_earlier_rows() {
        let x = array![[1.0], [-1.0], [1.0]];
        let y = array![10.0, 20.0, 30.0];
        let mut knn = KnnRegressor::new(2);
        knn.fit(&x, &y).unwrap();
        let preds = knn.predict(array![[0.0]].view()).unwrap();
        // rows 0 and 1 are both at distance 1 and come before row 2
        assert!((preds[0] - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_predict_before_fit() {
        let knn = KnnClassifier::new(3);
        assert!(matches!(
            knn.predict(array![[1.0, 1.0]].view()),
            Err(ForecastError::NotFitted)
        ));
    }

    #[test]
    fn test_fit_rejects_k_above_samples() {
        let (x, y) = clusters();
        let mut knn = KnnClassifier::new(7);
        assert!(matches!(
            knn.fit(&x, &y),
            Err(ForecastError::InsufficientSamples { needed: 7, available: 6 })
        ));
    }

    #[test]
    fn test_fit_rejects_length_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let mut knn = KnnRegressor::new(1);
        assert!(knn.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = clusters();
        let mut knn = KnnClassifier::new(3);
        knn.fit(&x, &y).unwrap();
        assert!(knn.predict(array![[1.0, 2.0, 3.0]].view()).is_err());
    }

    #[test]
    fn test_with_neighbors_keeps_configuration() {
        let base = KnnRegressor::new(3)
            .with_weighting(Weighting::Distance)
            .with_metric(DistanceMetric::Manhattan);
        let other = base.with_neighbors(9);
        assert_eq!(other.neighbors(), 9);
        assert_eq!(other.weighting, Weighting::Distance);
        assert_eq!(other.metric, DistanceMetric::Manhattan);
        assert!(other.index.is_none());
    }

    #[test]
    fn test_distance_metrics() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert!((DistanceMetric::Euclidean.distance(a.view(), b.view()) - 5.0).abs() < 1e-10);
        assert!((DistanceMetric::Manhattan.distance(a.view(), b.view()) - 7.0).abs() < 1e-10);
        assert!((DistanceMetric::Minkowski(2.0).distance(a.view(), b.view()) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_regressor_score_is_negative_mse() {
        let y = array![1.0, 2.0];
        let p = array![2.0, 3.0];
        assert!((KnnRegressor::score(&y, &p).unwrap() + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_partial_selection_matches_full_sort() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let query = array![4.0, 5.0];
        let mut full: Vec<Neighbor> = x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| (i, DistanceMetric::Euclidean.distance(query.view(), row)))
            .collect();
        full.sort_by(by_distance);
        for k in [1, 5, 13, 40, 60] {
            let near = nearest_rows(&x, query.view(), k, DistanceMetric::Euclidean);
            assert_eq!(near, full[..k.min(40)].to_vec());
        }
    }

    #[test]
    fn test_cached_prefixes_match_predict() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| ((i * 5 + j * 2) % 9) as f64 + i as f64 * 0.01);
        let y_cls = Array1::from_shape_fn(30, |i| if (i * 3) % 7 < 3 { 1 } else { -1 });
        let y_reg = Array1::from_shape_fn(30, |i| 100.0 + (i as f64 * 0.8).sin() * 4.0);
        let queries = array![[1.0, 2.0], [4.5, 4.5], [8.0, 0.0], [3.0, 3.0]];
        let table = neighbor_table(&x, queries.view(), 12, DistanceMetric::Manhattan);

        for k in 2..=12 {
            let mut cls = KnnClassifier::new(k)
                .with_weighting(Weighting::Distance)
                .with_metric(DistanceMetric::Manhattan);
            cls.fit(&x, &y_cls).unwrap();
            assert_eq!(
                cls.predict_from_neighbors(&table, &y_cls),
                cls.predict(queries.view()).unwrap()
            );

            let mut reg = KnnRegressor::new(k).with_metric(DistanceMetric::Manhattan);
            reg.fit(&x, &y_reg).unwrap();
            let cached = reg.predict_from_neighbors(&table, &y_reg);
            let direct = reg.predict(queries.view()).unwrap();
            for (a, b) in cached.iter().zip(direct.iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_minkowski_power_validated() {
        assert!(DistanceMetric::minkowski(3.0).is_ok());
        assert!(DistanceMetric::minkowski(1.0).is_ok());
        assert!(matches!(
            DistanceMetric::minkowski(0.5),
            Err(ForecastError::InvalidMetric(_))
        ));
        assert!(DistanceMetric::minkowski(0.0).is_err());
        assert!(DistanceMetric::minkowski(f64::NAN).is_err());
        assert!(DistanceMetric::minkowski(f64::INFINITY).is_err());
    }

    #[test]
    fn test_fit_rejects_invalid_minkowski_power() {
        let (x, y) = clusters();
        let mut knn = KnnClassifier::new(3).with_metric(DistanceMetric::Minkowski(-1.0));
        assert!(matches!(knn.fit(&x, &y), Err(ForecastError::InvalidMetric(_))));
    }
}
