//! CSV file data adapter.
//!
//! Reads the processed price files produced by the data pipeline:
//! `<coin>_processed_ohlc.csv` when a candle file exists, otherwise
//! `<coin>_processed.csv`. Columns are located by header name, so extra
//! columns (volume, precomputed indicators) are ignored.

use crate::domain::error::CoinbackError;
use crate::domain::ohlcv::Bar;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const OHLC_SUFFIX: &str = "_processed_ohlc.csv";
const CLOSE_SUFFIX: &str = "_processed.csv";

// `%.f` also matches a value with no fractional part.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, coin: &str) -> Option<PathBuf> {
        [OHLC_SUFFIX, CLOSE_SUFFIX]
            .iter()
            .map(|suffix| self.base_path.join(format!("{coin}{suffix}")))
            .find(|p| p.is_file())
    }
}

/// Parse a timestamp cell: `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// `YYYY-MM-DD`, or integer epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    raw.parse::<i64>().ok().and_then(millis_to_datetime)
}

pub fn millis_to_datetime(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

struct Columns {
    timestamp: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, path: &Path) -> Result<Self, CoinbackError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let missing = |column: &str| CoinbackError::Data {
            reason: format!("{}: missing `{column}` column", path.display()),
        };

        Ok(Columns {
            timestamp: find(&["timestamp", "date"]).ok_or_else(|| missing("timestamp"))?,
            close: find(&["close", "price"]).ok_or_else(|| missing("close"))?,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
        })
    }
}

fn parse_field(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<Option<f64>, CoinbackError> {
    match record.get(index).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|e| CoinbackError::Data {
            reason: format!("line {line}: invalid {name} value `{raw}`: {e}"),
        }),
    }
}

fn read_bars(path: &Path) -> Result<Vec<Bar>, CoinbackError> {
    let content = fs::read_to_string(path).map_err(|e| CoinbackError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| CoinbackError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?
        .clone();
    let columns = Columns::locate(&headers, path)?;

    let mut bars = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = result.map_err(|e| CoinbackError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;

        let raw_ts = record.get(columns.timestamp).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| CoinbackError::Data {
            reason: format!("line {line}: invalid timestamp `{raw_ts}`"),
        })?;

        let Some(close) = parse_field(&record, columns.close, "close", line)? else {
            return Err(CoinbackError::Data {
                reason: format!("line {line}: missing close value"),
            });
        };

        let optional = |index: Option<usize>, name: &str| match index {
            Some(i) => parse_field(&record, i, name, line),
            None => Ok(None),
        };

        bars.push(Bar {
            timestamp,
            open: optional(columns.open, "open")?,
            high: optional(columns.high, "high")?,
            low: optional(columns.low, "low")?,
            close,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Coin names for files in `dir` ending in one of `suffixes`, sorted and
/// deduplicated.
pub fn coins_with_suffix(dir: &Path, suffixes: &[&str]) -> Result<Vec<String>, CoinbackError> {
    let entries = fs::read_dir(dir).map_err(|e| CoinbackError::Data {
        reason: format!("failed to read directory {}: {}", dir.display(), e),
    })?;

    let mut coins = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoinbackError::Data {
            reason: format!("directory entry error: {}", e),
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(coin) = suffixes.iter().find_map(|s| name.strip_suffix(s)) {
            coins.push(coin.to_string());
        }
    }

    coins.sort();
    coins.dedup();
    Ok(coins)
}

impl DataPort for CsvAdapter {
    fn load_series(&self, coin: &str) -> Result<PriceSeries, CoinbackError> {
        let path = self.csv_path(coin).ok_or_else(|| CoinbackError::NoData {
            coin: coin.to_string(),
        })?;
        debug!(path = %path.display(), "reading csv price file");

        let bars = read_bars(&path)?;
        if bars.is_empty() {
            return Err(CoinbackError::NoData {
                coin: coin.to_string(),
            });
        }
        Ok(PriceSeries::new(bars)?)
    }

    fn list_coins(&self) -> Result<Vec<String>, CoinbackError> {
        coins_with_suffix(&self.base_path, &[OHLC_SUFFIX, CLOSE_SUFFIX])
    }
}
