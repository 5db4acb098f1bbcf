use crate::config::SplitConfig;
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Train/test row indices. Used both for the hold-out split and for each
/// cross-validation fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub type SplitIndices = CvSplit;

/// Hold out the last `ceil(test_size * n)` rows.
///
/// Without shuffling the training rows are a strict prefix of the series and
/// the test rows the matching suffix, so no future day trains the model that
/// is scored on it. The shuffle is seeded and therefore reproducible.
pub fn train_test_split(n_samples: usize, config: &SplitConfig) -> Result<SplitIndices> {
    if !(config.test_size > 0.0 && config.test_size < 1.0) {
        return Err(ForecastError::InvalidSplit(format!(
            "test_size must lie in (0, 1), got {}",
            config.test_size
        )));
    }

    let n_test = (config.test_size * n_samples as f64).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_train == 0 || n_test == 0 {
        return Err(ForecastError::InvalidSplit(format!(
            "{} samples leave {} for training and {} for testing",
            n_samples, n_train, n_test
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    if config.shuffle {
        let mut rng = StdRng::seed_from_u64(config.seed);
        indices.shuffle(&mut rng);
    }
    let test = indices.split_off(n_train);

    Ok(CvSplit {
        train: indices,
        test,
    })
}

/// Contiguous, unshuffled k-fold. The first `n % folds` folds carry one
/// extra sample.
pub fn k_fold(n_samples: usize, folds: usize) -> Result<Vec<CvSplit>> {
    check_folds(n_samples, folds)?;

    let base = n_samples / folds;
    let extra = n_samples % folds;
    let mut assignment = Vec::with_capacity(n_samples);
    for fold in 0..folds {
        let size = base + usize::from(fold < extra);
        assignment.extend(std::iter::repeat(fold).take(size));
    }

    Ok(splits_from_assignment(&assignment, folds))
}

/// Unshuffled stratified k-fold.
///
/// Fold sizes are balanced by dealing the class-sorted labels round-robin
/// over the folds; each class then fills its per-fold quota in row order.
pub fn stratified_k_fold(labels: &[i32], folds: usize) -> Result<Vec<CvSplit>> {
    check_folds(labels.len(), folds)?;

    let mut classes: Vec<i32> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let class_index = |label: i32| classes.binary_search(&label).unwrap_or_default();

    let encoded: Vec<usize> = labels.iter().map(|&l| class_index(l)).collect();
    let mut sorted = encoded.clone();
    sorted.sort_unstable();

    // allocation[fold][class] = how many samples of `class` land in `fold`
    let mut allocation = vec![vec![0usize; classes.len()]; folds];
    for (pos, &class) in sorted.iter().enumerate() {
        allocation[pos % folds][class] += 1;
    }

    let mut assignment = vec![0usize; labels.len()];
    for class in 0..classes.len() {
        let mut targets = (0..folds).flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]));
        for (row, &enc) in encoded.iter().enumerate() {
            if enc == class {
                assignment[row] = targets.next().unwrap_or(folds - 1);
            }
        }
    }

    Ok(splits_from_assignment(&assignment, folds))
}

fn check_folds(n_samples: usize, folds: usize) -> Result<()> {
    if folds < 2 || n_samples < folds {
        return Err(ForecastError::InvalidFolds {
            folds,
            samples: n_samples,
        });
    }
    Ok(())
}

fn splits_from_assignment(assignment: &[usize], folds: usize) -> Vec<CvSplit> {
    (0..folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..assignment.len()).partition(|&row| assignment[row] == fold);
            CvSplit { train, test }
        })
        .collect()
}

pub fn select_rows<S>(x: &ArrayBase<S, Ix2>, rows: &[usize]) -> Array2<f64>
where
    S: Data<Elem = f64>,
{
    x.select(Axis(0), rows)
}

pub fn select_values<T: Clone>(y: &Array1<T>, rows: &[usize]) -> Array1<T> {
    rows.iter().map(|&i| y[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn chronological(test_size: f64) -> SplitConfig {
        SplitConfig {
            test_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_is_order_preserving() {
        let split = train_test_split(20, &chronological(0.25)).unwrap();
        let joined: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        assert_eq!(joined, (0..20).collect::<Vec<_>>());
        assert_eq!(split.train.len(), 15);
        assert_eq!(split.test.len(), 5);
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        // ceil(0.25 * 19) = 5
        let split = train_test_split(19, &chronological(0.25)).unwrap();
        assert_eq!(split.test.len(), 5);
        assert_eq!(split.train.len(), 14);
        assert_eq!(split.train.last(), Some(&13));
        assert_eq!(split.test.first(), Some(&14));
    }

    #[test]
    fn test_split_ratio_close_to_three_quarters() {
        for n in [40usize, 101, 997, 2500] {
            let split = train_test_split(n, &chronological(0.25)).unwrap();
            let ratio = split.train.len() as f64 / n as f64;
            assert!((ratio - 0.75).abs() <= 1.0 / n as f64);
        }
    }

    #[test]
    fn test_split_repeatable() {
        let a = train_test_split(20, &chronological(0.25)).unwrap();
        let b = train_test_split(20, &chronological(0.25)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seeded_shuffle_repeatable_and_disjoint() {
        let cfg = SplitConfig {
            test_size: 0.25,
            shuffle: true,
            seed: 42,
        };
        let a = train_test_split(40, &cfg).unwrap();
        let b = train_test_split(40, &cfg).unwrap();
        assert_eq!(a, b);
        let mut all: Vec<usize> = a.train.iter().chain(a.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rejects_bad_test_size() {
        assert!(train_test_split(10, &chronological(0.0)).is_err());
        assert!(train_test_split(10, &chronological(1.0)).is_err());
        assert!(train_test_split(10, &chronological(-0.5)).is_err());
    }

    #[test]
    fn test_split_rejects_empty_side() {
        assert!(matches!(
            train_test_split(1, &chronological(0.25)),
            Err(ForecastError::InvalidSplit(_))
        ));
        assert!(train_test_split(0, &chronological(0.25)).is_err());
    }

    #[test]
    fn test_k_fold_sizes_front_loaded() {
        let splits = k_fold(12, 5).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2, 2]);
        assert_eq!(splits[0].test, vec![0, 1, 2]);
        assert_eq!(splits[4].test, vec![10, 11]);
    }

    #[test]
    fn test_k_fold_covers_each_row_once() {
        let splits = k_fold(23, 5).unwrap();
        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
        for split in &splits {
            assert_eq!(split.train.len() + split.test.len(), 23);
            assert!(split.train.iter().all(|i| !split.test.contains(i)));
        }
    }

    #[test]
    fn test_k_fold_rejects_bad_folds() {
        assert!(matches!(k_fold(10, 1), Err(ForecastError::InvalidFolds { .. })));
        assert!(matches!(k_fold(3, 5), Err(ForecastError::InvalidFolds { .. })));
    }

    #[test]
    fn test_stratified_preserves_class_balance() {
        let labels: Vec<i32> = (0..20).map(|i| if i % 4 == 0 { 1 } else { -1 }).collect();
        let splits = stratified_k_fold(&labels, 5).unwrap();
        for split in &splits {
            assert_eq!(split.test.len(), 4);
            let ups = split.test.iter().filter(|&&i| labels[i] == 1).count();
            assert_eq!(ups, 1);
        }
    }

    #[test]
    fn test_stratified_covers_each_row_once() {
        let labels = vec![1, 1, -1, 1, -1, -1, -1, 1, 1, -1, 1, 1, -1];
        let splits = stratified_k_fold(&labels, 5).unwrap();
        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..labels.len()).collect::<Vec<_>>());
        assert!(splits.iter().all(|s| !s.test.is_empty()));
    }

    #[test]
    fn test_stratified_keeps_row_order_within_class() {
        let labels = vec![1, -1, 1, -1, 1, -1, 1, -1, 1, -1];
        let splits = stratified_k_fold(&labels, 5).unwrap();
        // The earliest up-day and earliest down-day land in the first fold.
        assert_eq!(splits[0].test, vec![0, 1]);
        assert_eq!(splits[4].test, vec![8, 9]);
    }

    #[test]
    fn test_select_rows_and_values() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let y = array![10, 20, 30];
        let xs = select_rows(&x, &[2, 0]);
        assert_eq!(xs, array![[5.0, 6.0], [1.0, 2.0]]);
        assert_eq!(select_values(&y, &[1]), array![20]);
    }
}
