//! Market-data provider backed by a directory of per-ticker CSV files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Duration;
use theta_core::{MarketDataError, MarketDataProvider, PriceBar};
use tracing::debug;

use crate::csv_storage::CsvStorage;

/// Serves `<dir>/<TICKER>.csv` files as price history.
///
/// The lookback window is measured back from the newest bar in the file, so
/// static fixtures behave the same regardless of the current date.
#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    dir: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.to_uppercase()))
    }
}

#[async_trait]
impl MarketDataProvider for CsvPriceProvider {
    async fn get_price_history(
        &self,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        let path = self.path_for(ticker);
        debug!(ticker, path = %path.display(), lookback_days, "Loading price history");

        let contents = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarketDataError::NotFound {
                    ticker: ticker.to_uppercase(),
                });
            }
            Err(e) => return Err(MarketDataError::Io(e)),
        };

        let bars = CsvStorage::parse_bars(contents.as_slice())
            .map_err(|e| MarketDataError::Parse(format!("{e:#}")))?;

        let Some(latest) = bars.last().map(|b| b.timestamp) else {
            return Err(MarketDataError::NotFound {
                ticker: ticker.to_uppercase(),
            });
        };

        let cutoff = latest - Duration::days(i64::from(lookback_days));
        Ok(bars.into_iter().filter(|b| b.timestamp >= cutoff).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, name: &str, rows: &[&str]) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        writeln!(file, "date,close").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
    }

    #[tokio::test]
    async fn loads_ticker_file_case_insensitively() {
        let dir = TempDir::new().unwrap();
        write_fixture(&dir, "TQQQ.csv", &["2025-01-02,80.5", "2025-01-03,81"]);

        let provider = CsvPriceProvider::new(dir.path());
        let bars = provider.get_price_history("tqqq", 365).await.unwrap();

        assert_eq!(bars.len(), 2);
    }

    #[tokio::test]
    async fn trims_to_lookback_from_latest_bar() {
        let dir = TempDir::new().unwrap();
        write_fixture(
            &dir,
            "QQQ.csv",
            &["2024-01-01,400", "2024-12-01,480", "2024-12-30,500", "2025-01-02,505"],
        );

        let provider = CsvPriceProvider::new(dir.path());
        let bars = provider.get_price_history("QQQ", 40).await.unwrap();

        assert_eq!(bars.len(), 3);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let provider = CsvPriceProvider::new(dir.path());

        let err = provider.get_price_history("NOPE", 30).await.unwrap_err();
        assert!(matches!(err, MarketDataError::NotFound { ticker } if ticker == "NOPE"));
    }

    #[tokio::test]
    async fn malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write_fixture(&dir, "BAD.csv", &["2025-01-02,not-a-price"]);

        let provider = CsvPriceProvider::new(dir.path());
        let err = provider.get_price_history("BAD", 30).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Parse(_)));
    }
}
