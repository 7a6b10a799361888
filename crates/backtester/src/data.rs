use crate::error::BacktestError;
use chrono::{NaiveDate, NaiveDateTime};
use core_types::Bar;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// One row of a bar file. Column names are matched case-insensitively for the
/// common capitalised export format.
#[derive(Debug, Deserialize)]
struct BarRow {
    #[serde(alias = "Date", alias = "datetime", alias = "Datetime")]
    date: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads bars from a CSV file with a `date,open,high,low,close,volume` header.
///
/// Rows that cannot be parsed are skipped with a warning. Bars are returned in
/// file order; ordering and price sanity are checked later by the bar gate.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, BacktestError> {
    let file = File::open(path).map_err(|source| BacktestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut bars = Vec::new();
    for (idx, row) in reader.deserialize::<BarRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(line, error = %e, "Skipping unreadable bar row");
                continue;
            }
        };
        let Some(timestamp) = parse_timestamp(&row.date) else {
            tracing::warn!(line, date = %row.date, "Skipping bar row with unparseable date");
            continue;
        };
        bars.push(Bar::new(
            timestamp, row.open, row.high, row.low, row.close, row.volume,
        ));
    }

    tracing::info!(path = %path.display(), count = bars.len(), "Loaded bars");
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_dates_and_datetimes() {
        let file = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-02,10,11,9,10.5,1000\n\
             2024-01-03 15:30:00,10.5,12,10,11,2000\n",
        );
        let bars = load_bars(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(bars[1].timestamp.format("%H:%M").to_string(), "15:30");
        assert_eq!(bars[1].close, 11.0);
    }

    #[test]
    fn skips_malformed_rows() {
        let file = write_csv(
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,10,11,9,10.5,1000\n\
             not-a-date,10,11,9,10.5,1000\n\
             2024-01-04,ten,11,9,10.5,1000\n\
             2024-01-05,10,11,9,10.5,1000\n",
        );
        let bars = load_bars(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].session_date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_bars(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, BacktestError::Io { .. }));
    }
}
