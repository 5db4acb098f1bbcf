use crate::domain::{Direction, PriceRecord};
use crate::error::{ForecastError, Result};
use ndarray::{s, Array1, Array2, ArrayView2};

pub const FEATURE_NAMES: [&str; 2] = ["Open-Close", "High-Low"];

/// Same-day price spreads. Neither feature looks past the current row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    /// Open minus close; positive on a down day.
    pub open_close: f64,
    /// Intraday range.
    pub high_low: f64,
}

impl FeatureVector {
    pub fn from_record(record: &PriceRecord) -> Self {
        Self {
            open_close: record.open - record.close,
            high_low: record.high - record.low,
        }
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.open_close, self.high_low]
    }
}

/// Model inputs derived from a cleaned history.
///
/// `x` and `close` cover every record. `labels` stops one row short because
/// the final day has no next close to compare against.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub x: Array2<f64>,
    pub close: Array1<f64>,
    pub labels: Array1<i32>,
}

impl FeatureSet {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    /// Feature rows aligned with `labels` (final row excluded).
    pub fn classification_matrix(&self) -> ArrayView2<'_, f64> {
        self.x.slice(s![..self.labels.len(), ..])
    }

    /// Features of the final day, the one row with no label yet.
    pub fn latest_row(&self) -> ArrayView2<'_, f64> {
        let n = self.x.nrows();
        self.x.slice(s![n.saturating_sub(1).., ..])
    }
}

/// One label per adjacent pair of records: +1 iff the next close is higher.
pub fn direction_labels(records: &[PriceRecord]) -> Vec<Direction> {
    records
        .windows(2)
        .map(|pair| Direction::between(pair[0].close, pair[1].close))
        .collect()
}

pub fn build_feature_set(records: &[PriceRecord]) -> Result<FeatureSet> {
    if records.is_empty() {
        return Err(ForecastError::EmptyDataset);
    }

    let flat: Vec<f64> = records
        .iter()
        .flat_map(|r| FeatureVector::from_record(r).as_array())
        .collect();
    let x = Array2::from_shape_vec((records.len(), FEATURE_NAMES.len()), flat).map_err(|_| {
        ForecastError::LengthMismatch {
            expected: records.len() * FEATURE_NAMES.len(),
            actual: records.len(),
        }
    })?;

    let close = records.iter().map(|r| r.close).collect::<Array1<f64>>();
    let labels = direction_labels(records)
        .into_iter()
        .map(Direction::as_label)
        .collect::<Array1<i32>>();

    Ok(FeatureSet { x, close, labels })
}
