use std::fs::File;
use std::io::Read;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, Writer};
use rust_decimal::Decimal;
use theta_core::PriceBar;

pub struct CsvStorage;

impl CsvStorage {
    /// Writes bars to a CSV file readable by [`CsvStorage::read_bars`].
    ///
    /// Format: timestamp,open,high,low,close,volume
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_bars(path: &str, bars: &[PriceBar]) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create CSV file: {path}"))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(["timestamp", "open", "high", "low", "close", "volume"])?;

        let mut sorted = bars.to_vec();
        sorted.sort_by_key(|b| b.timestamp);

        for bar in sorted {
            writer.write_record(&[
                bar.timestamp.to_rfc3339(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Reads bars from a CSV file, oldest first.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a row is malformed
    pub fn read_bars(path: &str) -> Result<Vec<PriceBar>> {
        let file = File::open(path).with_context(|| format!("Failed to open CSV file: {path}"))?;
        Self::parse_bars(file).with_context(|| format!("Failed to parse CSV file: {path}"))
    }

    /// Parses bars from any CSV source.
    ///
    /// Headers are matched case-insensitively. A `timestamp` (or `date`) and
    /// a `close` column are required; `open`, `high`, `low` default to the
    /// close and `volume` to zero. Timestamps may be RFC 3339,
    /// `YYYY-MM-DD HH:MM:SS±HH:MM` or a bare `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Returns error if required columns are missing or a value fails to parse
    pub fn parse_bars<R: Read>(source: R) -> Result<Vec<PriceBar>> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
        let columns = Columns::from_headers(reader.headers()?)?;

        let mut bars = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result?;
            let bar = columns
                .parse(&record)
                .with_context(|| format!("Invalid row {}", line + 2))?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

struct Columns {
    timestamp: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };

        Ok(Self {
            timestamp: find(&["timestamp", "date", "datetime"])
                .context("Missing timestamp/date column")?,
            close: find(&["close"]).context("Missing close column")?,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            volume: find(&["volume"]),
        })
    }

    fn parse(&self, record: &StringRecord) -> Result<PriceBar> {
        let field = |idx: usize| record.get(idx).unwrap_or_default();
        let decimal_or = |idx: Option<usize>, fallback: Decimal| -> Result<Decimal> {
            match idx.map(field).filter(|s| !s.is_empty()) {
                Some(s) => Decimal::from_str(s).with_context(|| format!("Invalid decimal: {s}")),
                None => Ok(fallback),
            }
        };

        let timestamp = parse_timestamp(field(self.timestamp))?;
        let close = decimal_or(Some(self.close), Decimal::ZERO)?;
        let volume = match self.volume.map(field).filter(|s| !s.is_empty()) {
            // Some exports write volume as a float
            Some(s) => s
                .split('.')
                .next()
                .unwrap_or_default()
                .parse::<u64>()
                .with_context(|| format!("Invalid volume: {s}"))?,
            None => 0,
        };

        Ok(PriceBar {
            timestamp,
            open: decimal_or(self.open, close)?,
            high: decimal_or(self.high, close)?,
            low: decimal_or(self.low, close)?,
            close,
            volume,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid timestamp: {raw}"))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn parses_full_ohlcv_rows() {
        let data = "timestamp,open,high,low,close,volume\n\
                    2025-01-03T21:00:00Z,10,11,9.5,10.5,1200\n\
                    2025-01-02T21:00:00Z,9,10,8.5,9.75,1000\n";
        let bars = CsvStorage::parse_bars(data.as_bytes()).unwrap();

        assert_eq!(bars.len(), 2);
        // sorted oldest first
        assert_eq!(bars[0].close, dec!(9.75));
        assert_eq!(bars[1].high, dec!(11));
        assert_eq!(bars[1].volume, 1200);
    }

    #[test]
    fn accepts_date_and_close_only() {
        let data = "Date,Close\n2024-06-03,101.25\n";
        let bars = CsvStorage::parse_bars(data.as_bytes()).unwrap();

        assert_eq!(bars[0].close, dec!(101.25));
        assert_eq!(bars[0].open, dec!(101.25));
        assert_eq!(bars[0].volume, 0);
        assert_eq!(bars[0].timestamp.day(), 3);
    }

    #[test]
    fn accepts_offset_timestamps_and_float_volume() {
        let data = "Date,Open,High,Low,Close,Volume\n\
                    2024-01-02 00:00:00-05:00,50,51,49,50.5,31337.0\n";
        let bars = CsvStorage::parse_bars(data.as_bytes()).unwrap();

        assert_eq!(
            bars[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap()
        );
        assert_eq!(bars[0].volume, 31337);
    }

    #[test]
    fn missing_close_column_is_an_error() {
        let data = "timestamp,open\n2025-01-02,1\n";
        assert!(CsvStorage::parse_bars(data.as_bytes()).is_err());
    }

    #[test]
    fn invalid_price_reports_error() {
        let data = "date,close\n2025-01-02,abc\n";
        assert!(CsvStorage::parse_bars(data.as_bytes()).is_err());
    }

    #[test]
    fn write_then_read_preserves_bars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("SOXL.csv");
        let path = path.to_str().unwrap();

        let bars = vec![
            PriceBar {
                timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 20, 0, 0).unwrap(),
                open: dec!(25.1),
                high: dec!(26.0),
                low: dec!(24.8),
                close: dec!(25.6),
                volume: 5_000_000,
            },
            PriceBar::from_close(Utc.with_ymd_and_hms(2025, 3, 3, 20, 0, 0).unwrap(), dec!(25)),
        ];
        CsvStorage::write_bars(path, &bars).unwrap();

        let loaded = CsvStorage::read_bars(path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].close, dec!(25));
        assert_eq!(loaded[1], bars[0]);
    }
}
