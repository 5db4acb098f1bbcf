use crate::engine::{CandidateScore, ClassificationOutcome, RegressionOutcome};
use crate::pipeline::{NextDayForecast, RunReport};

fn index_width(rows: usize) -> usize {
    rows.saturating_sub(1).max(1).to_string().len()
}

/// Leading rows of the direction comparison, laid out like a data frame.
pub fn classification_table(outcome: &ClassificationOutcome, rows: usize) -> String {
    let shown = &outcome.comparisons[..rows.min(outcome.comparisons.len())];
    let w = index_width(shown.len());
    let mut out = format!("{:>w$}  {:>6}  {:>9}\n", "", "Actual", "Predicted");
    for (i, c) in shown.iter().enumerate() {
        out.push_str(&format!("{:>w$}  {:>6}  {:>9}\n", i, c.actual, c.predicted));
    }
    out
}

pub fn regression_table(outcome: &RegressionOutcome, rows: usize) -> String {
    let shown = &outcome.comparisons[..rows.min(outcome.comparisons.len())];
    let w = index_width(shown.len());
    let mut out = format!("{:>w$}  {:>12}  {:>15}\n", "", "Actual Close", "Predicted Close");
    for (i, c) in shown.iter().enumerate() {
        out.push_str(&format!("{:>w$}  {:>12.2}  {:>15.2}\n", i, c.actual, c.predicted));
    }
    out
}

/// Boxed per-k cross-validation summary.
pub fn grid_summary(title: &str, best_k: usize, candidates: &[CandidateScore], skipped: &[usize]) -> String {
    let rule = "=".repeat(50);
    let mut out = format!("\n{rule}\n  {title}\n{rule}\n");
    out.push_str(&format!("  Best k:             {:>12}\n", best_k));
    out.push_str(&format!("  {:>4}  {:>12}  {:>10}  {:>5}\n", "k", "Mean Score", "Std", "Rank"));
    for c in candidates {
        out.push_str(&format!(
            "  {:>4}  {:>12.4}  {:>10.4}  {:>5}\n",
            c.k, c.mean_score, c.std_score, c.rank
        ));
    }
    if !skipped.is_empty() {
        let list: Vec<String> = skipped.iter().map(|k| k.to_string()).collect();
        out.push_str(&format!("  Skipped k:          {}\n", list.join(", ")));
    }
    out
}

pub fn confusion_summary(outcome: &ClassificationOutcome) -> String {
    let m = &outcome.confusion;
    format!(
        "  Confusion ({} test days): TP {} FP {} FN {} TN {}\n  Up Precision:       {:>12.2}\n  Up Recall:          {:>12.2}\n",
        m.total(),
        m.true_up,
        m.false_up,
        m.false_down,
        m.true_down,
        m.precision_up(),
        m.recall_up()
    )
}

pub fn forecast_line(forecast: &NextDayForecast) -> String {
    let day = forecast
        .last_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "last row".to_string());
    format!(
        "Next-day direction after {} (close {:.2}): {:?}",
        day, forecast.last_close, forecast.direction
    )
}

pub fn print_classification(outcome: &ClassificationOutcome, rows: usize) {
    println!("Classification Train Acc: {:.2}", outcome.train_accuracy);
    println!("Classification Test  Acc: {:.2}", outcome.test_accuracy);
    println!("\nSample Classification Results:");
    print!("{}", classification_table(outcome, rows));
}

pub fn print_regression(outcome: &RegressionOutcome, rows: usize) {
    println!("\nRegression RMSE: {:.2}", outcome.test_rmse);
    println!("\nSample Regression Results:");
    print!("{}", regression_table(outcome, rows));
}

pub fn print_report(report: &RunReport) {
    let rows = report.config.sample_rows;
    let c = &report.classification;
    let r = &report.regression;

    print!(
        "{}",
        grid_summary("DIRECTION CLASSIFIER (CV accuracy)", c.best_k, &c.cv_results, &c.skipped_k)
    );
    print!("{}", confusion_summary(c));
    print!(
        "{}",
        grid_summary("CLOSE REGRESSOR (CV -MSE)", r.best_k, &r.cv_results, &r.skipped_k)
    );
    println!("  Test MAE:           {:>12.2}", r.test_mae);
    println!("  Test R2:            {:>12.4}", r.test_r2);
    println!();

    print_classification(c, rows);
    print_regression(r, rows);
    println!("\n{}", forecast_line(&report.forecast));
}
