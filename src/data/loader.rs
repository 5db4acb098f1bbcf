use crate::domain::{LoadStats, PriceHistory, PriceRecord};
use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Price columns every input file must carry, spelled as the NSE export does.
pub const REQUIRED_COLUMNS: [&str; 4] = ["OPEN", "HIGH", "LOW", "close"];

const DATE_COLUMNS: [&str; 3] = ["date", "timestamp", "time"];

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%d-%b-%Y", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d",
];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Header positions resolved once per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    date: Option<usize>,
}

/// Load and clean a delimited OHLC file.
///
/// Column labels are trimmed before matching. Rows whose open/high/low/close
/// do not parse to finite numbers are dropped without failing the load.
pub fn load_prices<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<PriceHistory> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ForecastError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "reading price history");
    load_from_reader(file, delimiter)
}

/// Same as [`load_prices`] for any reader; the reader is consumed.
pub fn load_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<PriceHistory> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = resolve_columns(&headers)?;

    let mut records = Vec::new();
    let mut stats = LoadStats::default();

    for result in reader.byte_records() {
        let row = result?;
        stats.rows_read += 1;
        match parse_row(&row, &columns) {
            Some(record) => records.push(record),
            None => stats.rows_dropped += 1,
        }
    }

    if stats.rows_dropped > 0 {
        warn!(
            dropped = stats.rows_dropped,
            read = stats.rows_read,
            "dropped rows with missing or non-numeric prices"
        );
    }

    let history = PriceHistory { records, stats };
    if history.is_empty() {
        return Err(ForecastError::EmptyDataset);
    }

    info!(rows = history.len(), "price history loaded");
    Ok(history)
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnMap> {
    let labels: Vec<&str> = headers.iter().map(str::trim).collect();

    let find = |name: &str| {
        labels
            .iter()
            .position(|label| *label == name)
            .or_else(|| labels.iter().position(|label| label.eq_ignore_ascii_case(name)))
    };

    let positions: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|name| find(name)).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip(&positions)
        .filter(|(_, pos)| pos.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ForecastError::MissingColumns(missing));
    }

    let date = labels
        .iter()
        .position(|label| DATE_COLUMNS.iter().any(|d| label.eq_ignore_ascii_case(d)));

    Ok(ColumnMap {
        open: positions[0].unwrap_or_default(),
        high: positions[1].unwrap_or_default(),
        low: positions[2].unwrap_or_default(),
        close: positions[3].unwrap_or_default(),
        date,
    })
}

/// A row survives only when all four prices are present, valid UTF-8,
/// numeric and finite.
fn parse_row(row: &csv::ByteRecord, columns: &ColumnMap) -> Option<PriceRecord> {
    let record = PriceRecord::new(
        parse_price(row.get(columns.open))?,
        parse_price(row.get(columns.high))?,
        parse_price(row.get(columns.low))?,
        parse_price(row.get(columns.close))?,
    );
    if !record.is_finite() {
        return None;
    }
    match columns.date.and_then(|i| row.get(i)).and_then(parse_date) {
        Some(date) => Some(record.with_date(date)),
        None => Some(record),
    }
}

fn parse_price(field: Option<&[u8]>) -> Option<f64> {
    std::str::from_utf8(field?).ok()?.trim().parse().ok()
}

fn parse_date(field: &[u8]) -> Option<NaiveDate> {
    let field = std::str::from_utf8(field).ok()?.trim();
    if field.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(field, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(field, fmt).ok())
                .map(|dt| dt.date())
        })
}
