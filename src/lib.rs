//! K-nearest-neighbor models over daily OHLC prices: an up/down classifier
//! for the next close and a regressor for the current close, both tuned by
//! cross-validated grid search over the neighbor count.

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod pipeline;
pub mod report;

pub use config::PipelineConfig;
pub use error::{ForecastError, Result};
pub use pipeline::{run, RunReport};
