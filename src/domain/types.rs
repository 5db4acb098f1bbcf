use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One cleaned trading day. Row order is the time axis; `date` is kept only
/// when the source file carries a parsable date column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: Option<NaiveDate>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceRecord {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date: None,
            open,
            high,
            low,
            close,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// All four prices are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Row accounting from the cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub rows_dropped: usize,
}

impl LoadStats {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.rows_dropped
    }
}

/// Cleaned, order-preserving price table for a single instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub records: Vec<PriceRecord>,
    pub stats: LoadStats,
}

impl PriceHistory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    /// First and last known dates, if the file had a date column.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().find_map(|r| r.date)?;
        let last = self.records.iter().rev().find_map(|r| r.date)?;
        Some((first, last))
    }
}

/// Next-day price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// +1 when tomorrow closes strictly higher, otherwise -1.
    pub fn between(close_today: f64, close_tomorrow: f64) -> Self {
        if close_tomorrow > close_today {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn as_label(self) -> i32 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }

    pub fn from_label(label: i32) -> Self {
        if label > 0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}
