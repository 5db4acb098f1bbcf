use crate::domain::PriceHistory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Overview of a cleaned history, printed by `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub close_min: f64,
    pub close_max: f64,
    pub close_mean: f64,
    pub close_std: f64,
    pub up_days: usize,
    pub down_days: usize,
}

impl HistorySummary {
    pub fn from_history(history: &PriceHistory) -> Self {
        let closes = history.closes();
        let (first_date, last_date) = match history.date_range() {
            Some((first, last)) => (Some(first), Some(last)),
            None => (None, None),
        };
        let up_days = closes.windows(2).filter(|w| w[1] > w[0]).count();
        let down_days = closes.len().saturating_sub(1) - up_days;

        let close_std = if closes.len() > 1 {
            closes.iter().copied().std_dev()
        } else {
            0.0
        };

        Self {
            rows_read: history.stats.rows_read,
            rows_kept: history.stats.rows_kept(),
            rows_dropped: history.stats.rows_dropped,
            first_date,
            last_date,
            close_min: closes.iter().copied().fold(f64::INFINITY, f64::min),
            close_max: closes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            close_mean: closes.iter().copied().mean(),
            close_std,
            up_days,
            down_days,
        }
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(50));
        println!("  PRICE HISTORY");
        println!("{}", "=".repeat(50));
        println!("  Rows Read:          {:>12}", self.rows_read);
        println!("  Rows Kept:          {:>12}", self.rows_kept);
        println!("  Rows Dropped:       {:>12}", self.rows_dropped);
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            println!("  First Day:          {:>12}", first);
            println!("  Last Day:           {:>12}", last);
        }
        println!("  Close Min:          {:>12.2}", self.close_min);
        println!("  Close Max:          {:>12.2}", self.close_max);
        println!("  Close Mean:         {:>12.2}", self.close_mean);
        println!("  Close Std Dev:      {:>12.2}", self.close_std);
        println!("  Up Days:            {:>12}", self.up_days);
        println!("  Down/Flat Days:     {:>12}", self.down_days);
    }
}
