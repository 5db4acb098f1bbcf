use crate::config::PipelineConfig;
use crate::data::{load_prices, HistorySummary};
use crate::domain::{Direction, PriceHistory};
use crate::engine::{
    train_close_regressor, train_direction_classifier, ClassificationOutcome, Estimator,
    RegressionOutcome,
};
use crate::error::{ForecastError, Result};
use crate::features::{build_feature_set, FeatureSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Tuned models applied to the final, unlabeled day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NextDayForecast {
    pub last_date: Option<NaiveDate>,
    pub last_close: f64,
    /// Direction of the close following `last_date`.
    pub direction: Direction,
    /// Regressor estimate of the final day's own close from its spreads.
    pub close_estimate: f64,
}

/// Everything one run produces, ready for printing or JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub config: PipelineConfig,
    pub history: HistorySummary,
    pub classification: ClassificationOutcome,
    pub regression: RegressionOutcome,
    pub forecast: NextDayForecast,
}

impl RunReport {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ForecastError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "report written");
        Ok(())
    }
}

/// Load the configured file and run both models on it.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    let history = load_prices(&config.input, config.delimiter)?;
    run_on_history(&history, config)
}

pub fn run_on_history(history: &PriceHistory, config: &PipelineConfig) -> Result<RunReport> {
    let features = build_feature_set(&history.records)?;
    info!(
        rows = features.n_samples(),
        labeled = features.labels.len(),
        "features built"
    );

    let (classifier, classification) = train_direction_classifier(&features, config)?;
    let (regressor, regression) = train_close_regressor(&features, config)?;
    let forecast = forecast_latest(history, &features, &classifier, &regressor)?;

    Ok(RunReport {
        config: config.clone(),
        history: HistorySummary::from_history(history),
        classification,
        regression,
        forecast,
    })
}

fn forecast_latest<C, R>(
    history: &PriceHistory,
    features: &FeatureSet,
    classifier: &C,
    regressor: &R,
) -> Result<NextDayForecast>
where
    C: Estimator<Target = i32>,
    R: Estimator<Target = f64>,
{
    let last = history.records.last().ok_or(ForecastError::EmptyDataset)?;
    let row = features.latest_row();
    let single = |len: usize| ForecastError::LengthMismatch {
        expected: 1,
        actual: len,
    };
    let label = classifier.predict(row)?;
    let label = label.first().copied().ok_or_else(|| single(label.len()))?;
    let close = regressor.predict(row)?;
    let close_estimate = close.first().copied().ok_or_else(|| single(close.len()))?;

    let forecast = NextDayForecast {
        last_date: last.date,
        last_close: last.close,
        direction: Direction::from_label(label),
        close_estimate,
    };
    info!(direction = ?forecast.direction, "next-day forecast");
    Ok(forecast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(rows: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Date,OPEN,HIGH,LOW,close,VOLUME").unwrap();
        for i in 0..rows {
            let t = i as f64;
            let close = 800.0 + t + (t * 0.7).sin() * 6.0;
            let open = close + (t * 1.3).cos() * 4.0;
            let high = open.max(close) + 2.0;
            let low = open.min(close) - 2.0;
            writeln!(
                file,
                "2023-01-{:02},{:.2},{:.2},{:.2},{:.2},1000",
                (i % 28) + 1,
                open,
                high,
                low,
                close
            )
            .unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn config_for(file: &NamedTempFile) -> PipelineConfig {
        PipelineConfig {
            input: file.path().to_path_buf(),
            show_chart: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_end_to_end() {
        let file = write_csv(80);
        let report = run(&config_for(&file)).unwrap();
        assert_eq!(report.history.rows_kept, 80);
        // 79 labeled rows -> ceil(19.75) = 20 test
        assert_eq!(report.classification.test_size, 20);
        assert_eq!(report.classification.train_size, 59);
        assert_eq!(report.regression.test_size, 20);
        assert_eq!(report.regression.train_size, 60);
        assert!(report.regression.test_rmse >= 0.0);
    }

    #[test]
    fn test_twenty_row_scenario_is_repeatable() {
        let file = write_csv(20);
        let cfg = config_for(&file);
        let first = run(&cfg).unwrap();
        let second = run(&cfg).unwrap();
        assert_eq!(first.classification.train_size + first.classification.test_size, 19);
        assert_eq!(first.classification.comparisons, second.classification.comparisons);
        assert_eq!(first.regression.comparisons, second.regression.comparisons);
        assert_eq!(first.regression.best_k, second.regression.best_k);
    }

    #[test]
    fn test_dirty_rows_are_excluded_before_training() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "OPEN,HIGH,LOW,close").unwrap();
        for i in 0..40 {
            let c = 100.0 + i as f64;
            if i == 7 {
                writeln!(file, "{},{},,{}", c, c + 1.0, c).unwrap();
            } else if i == 21 {
                writeln!(file, "{},{},{},nan", c, c + 1.0, c - 1.0).unwrap();
            } else {
                writeln!(file, "{},{},{},{}", c - 0.5, c + 1.0, c - 1.0, c).unwrap();
            }
        }
        file.flush().unwrap();

        let report = run(&config_for(&file)).unwrap();
        assert_eq!(report.history.rows_read, 40);
        assert_eq!(report.history.rows_dropped, 2);
        assert_eq!(report.regression.train_size + report.regression.test_size, 38);
    }

    #[test]
    fn test_forecast_uses_fitted_models_on_final_day() {
        let file = write_csv(60);
        let cfg = config_for(&file);
        let history = load_prices(&cfg.input, cfg.delimiter).unwrap();
        let report = run_on_history(&history, &cfg).unwrap();

        let last = history.records.last().unwrap();
        assert_eq!(report.forecast.last_date, last.date);
        assert!((report.forecast.last_close - last.close).abs() < 1e-12);

        let features = build_feature_set(&history.records).unwrap();
        let (classifier, _) = train_direction_classifier(&features, &cfg).unwrap();
        let (regressor, _) = train_close_regressor(&features, &cfg).unwrap();
        let label = classifier.predict(features.latest_row()).unwrap()[0];
        let close = regressor.predict(features.latest_row()).unwrap()[0];
        assert_eq!(report.forecast.direction, Direction::from_label(label));
        assert!((report.forecast.close_estimate - close).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let cfg = PipelineConfig {
            input: "/definitely/not/here.csv".into(),
            ..Default::default()
        };
        assert!(matches!(run(&cfg), Err(ForecastError::Io { .. })));
    }

    #[test]
    fn test_report_json_round_trip() {
        let file = write_csv(40);
        let report = run(&config_for(&file)).unwrap();
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("report.json");
        report.write_json(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let back: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.regression.best_k, report.regression.best_k);
        assert_eq!(back.classification.comparisons, report.classification.comparisons);
    }
}
