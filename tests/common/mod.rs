#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use coinback::domain::error::CoinbackError;
use coinback::domain::indicator::{IndicatorKind, IndicatorSet, defined};
use coinback::domain::ohlcv::Bar;
use coinback::domain::price_series::PriceSeries;
use coinback::ports::data_port::DataPort;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, coin: &str, series: PriceSeries) -> Self {
        self.data.insert(coin.to_string(), series);
        self
    }

    pub fn with_error(mut self, coin: &str, reason: &str) -> Self {
        self.errors.insert(coin.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(&self, coin: &str) -> Result<PriceSeries, CoinbackError> {
        if let Some(reason) = self.errors.get(coin) {
            return Err(CoinbackError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(coin)
            .cloned()
            .ok_or_else(|| CoinbackError::NoData {
                coin: coin.to_string(),
            })
    }

    fn list_coins(&self) -> Result<Vec<String>, CoinbackError> {
        let mut coins: Vec<String> = self.data.keys().cloned().collect();
        coins.sort();
        Ok(coins)
    }
}

/// Midnight on the `day`-th day after 2024-01-01.
pub fn ts(day: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(day as i64)
}

pub fn close_series(closes: &[f64]) -> PriceSeries {
    let points: Vec<_> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| (ts(i), c))
        .collect();
    PriceSeries::from_closes(&points).unwrap()
}

/// Bars given as `(high, low, close)`; open is set to the close.
pub fn ohlc_series(bars: &[(f64, f64, f64)]) -> PriceSeries {
    PriceSeries::new(
        bars.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| Bar::ohlc(ts(i), close, high, low, close))
            .collect(),
    )
    .unwrap()
}

pub fn crossover_indicators(short: &[f64], long: &[f64]) -> IndicatorSet {
    IndicatorSet::new(short.len())
        .with_column(IndicatorKind::ShortMa, defined(short))
        .unwrap()
        .with_column(IndicatorKind::LongMa, defined(long))
        .unwrap()
}

/// Slow sine-like wave around 100, enough to produce several crossovers.
pub fn wave_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 15.0 * ((i as f64) / 6.0).sin() + (i as f64) * 0.2)
        .collect()
}

pub fn write_close_csv(dir: &Path, coin: &str, closes: &[f64]) {
    let path = dir.join(format!("{coin}_processed.csv"));
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "timestamp,close").unwrap();
    for (i, c) in closes.iter().enumerate() {
        writeln!(file, "{},{}", ts(i).format("%Y-%m-%d %H:%M:%S"), c).unwrap();
    }
}

pub fn write_ohlc_csv(dir: &Path, coin: &str, closes: &[f64]) {
    let path = dir.join(format!("{coin}_processed_ohlc.csv"));
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "timestamp,open,high,low,close").unwrap();
    for (i, c) in closes.iter().enumerate() {
        writeln!(
            file,
            "{},{},{},{},{}",
            ts(i).format("%Y-%m-%d %H:%M:%S"),
            c,
            c + 2.0,
            c - 2.0,
            c
        )
        .unwrap();
    }
}
