//! JSON market-data dump adapter.
//!
//! Reads the raw provider dumps: `<coin>_historical_ohlc.json` holding
//! `[[ms, open, high, low, close], ...]` or `<coin>_historical.json` holding
//! `[[ms, price], ...]`. Rows with a missing value are dropped.

use crate::adapters::csv_adapter::{coins_with_suffix, millis_to_datetime};
use crate::domain::error::CoinbackError;
use crate::domain::ohlcv::Bar;
use crate::domain::price_series::PriceSeries;
use crate::ports::data_port::DataPort;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const OHLC_SUFFIX: &str = "_historical_ohlc.json";
const CLOSE_SUFFIX: &str = "_historical.json";

type Row = Vec<Option<f64>>;

pub struct JsonAdapter {
    base_path: PathBuf,
}

impl JsonAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn json_path(&self, coin: &str) -> Option<PathBuf> {
        [OHLC_SUFFIX, CLOSE_SUFFIX]
            .iter()
            .map(|suffix| self.base_path.join(format!("{coin}{suffix}")))
            .find(|p| p.is_file())
    }
}

fn row_to_bar(row: &[Option<f64>]) -> Option<Bar> {
    let timestamp = millis_to_datetime((*row.first()?)? as i64)?;
    match row {
        [_, Some(close)] => Some(Bar::close_only(timestamp, *close)),
        [_, Some(open), Some(high), Some(low), Some(close)] => {
            Some(Bar::ohlc(timestamp, *open, *high, *low, *close))
        }
        _ => None,
    }
}

fn read_bars(path: &Path) -> Result<Vec<Bar>, CoinbackError> {
    let content = fs::read_to_string(path).map_err(|e| CoinbackError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    let rows: Vec<Row> = serde_json::from_str(&content).map_err(|e| CoinbackError::Data {
        reason: format!("JSON parse error in {}: {}", path.display(), e),
    })?;

    let total = rows.len();
    let mut bars: Vec<Bar> = rows.iter().filter_map(|r| row_to_bar(r)).collect();
    if bars.len() < total {
        warn!(
            path = %path.display(),
            dropped = total - bars.len(),
            "dropped incomplete rows"
        );
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

impl DataPort for JsonAdapter {
    fn load_series(&self, coin: &str) -> Result<PriceSeries, CoinbackError> {
        let path = self.json_path(coin).ok_or_else(|| CoinbackError::NoData {
            coin: coin.to_string(),
        })?;
        debug!(path = %path.display(), "reading json price dump");

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
