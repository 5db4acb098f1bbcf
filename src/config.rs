use crate::engine::knn::{DistanceMetric, Weighting};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// NSE daily export used when no input path is given.
pub const DEFAULT_INPUT: &str = "TATACONSUMER_ALLNSE.csv";

/// Chronological train/test split policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out at the end of the series.
    pub test_size: f64,
    /// Off by default: shuffling lets future rows leak into training.
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.25,
            shuffle: false,
            seed: 42,
        }
    }
}

/// Neighbor-count grid and cross-validation folds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub k_min: usize,
    pub k_max: usize,
    pub folds: usize,
}

impl GridConfig {
    pub fn candidates(&self) -> Vec<usize> {
        (self.k_min..=self.k_max).collect()
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 15,
            folds: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub weighting: Weighting,
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub delimiter: u8,
    pub split: SplitConfig,
    pub grid: GridConfig,
    pub model: ModelConfig,
    /// Rows printed from each comparison table.
    pub sample_rows: usize,
    pub show_chart: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            delimiter: b',',
            split: SplitConfig::default(),
            grid: GridConfig::default(),
            model: ModelConfig::default(),
            sample_rows: 10,
            show_chart: true,
        }
    }
}
