use crate::engine::RegressionOutcome;
use crate::error::Result;

pub const CHART_TITLE: &str = "KNN Regression: Actual vs Predicted Close";
pub const X_LABEL: &str = "Test Sample Index";
pub const Y_LABEL: &str = "Price";

/// Two aligned series over the test-sample index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub actual: Vec<[f64; 2]>,
    pub predicted: Vec<[f64; 2]>,
}

impl ChartSeries {
    pub fn from_outcome(outcome: &RegressionOutcome) -> Self {
        let indexed = |values: Vec<f64>| -> Vec<[f64; 2]> {
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| [i as f64, v])
                .collect()
        };
        Self {
            actual: indexed(outcome.actual()),
            predicted: indexed(outcome.predicted()),
        }
    }
}

#[cfg(feature = "gui")]
mod window {
    use super::{ChartSeries, CHART_TITLE, X_LABEL, Y_LABEL};
    use crate::error::{ForecastError, Result};
    use eframe::egui;
    use egui_plot::{Legend, Line, Plot, PlotPoints};

    struct ForecastChart {
        series: ChartSeries,
    }

    impl eframe::App for ForecastChart {
        fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.heading(CHART_TITLE);
                Plot::new("actual_vs_predicted")
                    .legend(Legend::default())
                    .x_axis_label(X_LABEL)
                    .y_axis_label(Y_LABEL)
                    .show(ui, |plot_ui| {
                        plot_ui.line(
                            Line::new(PlotPoints::new(self.series.actual.clone()))
                                .color(egui::Color32::from_rgb(0, 150, 255))
                                .width(2.0)
                                .name("Actual Close"),
                        );
                        plot_ui.line(
                            Line::new(PlotPoints::new(self.series.predicted.clone()))
                                .color(egui::Color32::from_rgb(255, 165, 0))
                                .width(2.0)
                                .name("Predicted Close"),
                        );
                    });
            });
        }
    }

    pub fn show(series: ChartSeries) -> Result<()> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1200.0, 600.0])
                .with_title(CHART_TITLE),
            ..Default::default()
        };
        eframe::run_native(
            CHART_TITLE,
            options,
            Box::new(|_cc| Ok(Box::new(ForecastChart { series }))),
        )
        .map_err(|e| ForecastError::Chart(e.to_string()))
    }
}

/// Open a window plotting actual against predicted closes. Blocks until the
/// window is closed.
#[cfg(feature = "gui")]
pub fn show_regression_chart(outcome: &RegressionOutcome) -> Result<()> {
    let series = ChartSeries::from_outcome(outcome);
    tracing::info!(points = series.actual.len(), "opening chart window");
    window::show(series)
}

#[cfg(not(feature = "gui"))]
pub fn show_regression_chart(_outcome: &RegressionOutcome) -> Result<()> {
    tracing::warn!("built without the `gui` feature, chart skipped");
    Ok(())
}
