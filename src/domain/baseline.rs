//! Buy-and-hold baseline.

use crate::domain::error::BacktestError;
use crate::domain::price_series::PriceSeries;

/// Value of `initial_cash` invested at the first bar's close and held to the
/// last bar's close. Fractional units are allowed, so the whole balance is
/// invested.
pub fn buy_and_hold(series: &PriceSeries, initial_cash: f64) -> Result<f64, BacktestError> {
    if !initial_cash.is_finite() || initial_cash <= 0.0 {
        return Err(BacktestError::InvalidInitialCash {
            value: initial_cash,
        });
    }
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(BacktestError::EmptySeries);
    };
    if first.close <= 0.0 {
        return Err(BacktestError::ArithmeticDegeneracy {
            index: 0,
            timestamp: first.timestamp,
            reason: format!("cannot buy at close price {}", first.close),
        });
    }

    let units = initial_cash / first.close;
    Ok(units * last.close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(closes: &[f64]) -> PriceSeries {
        let points: Vec<_> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| (ts(i as u32 + 1), c))
            .collect();
        PriceSeries::from_closes(&points).unwrap()
    }

    #[test]
    fn reference_scenario() {
        let s = series(&[100.0, 110.0, 90.0, 120.0]);
        assert_eq!(buy_and_hold(&s, 10_000.0).unwrap(), 12_000.0);
    }

    #[test]
    fn idempotent() {
        let s = series(&[100.0, 110.0, 90.0, 120.0]);
        let first = buy_and_hold(&s, 10_000.0).unwrap();
        let second = buy_and_hold(&s, 10_000.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn single_bar_returns_cash() {
        let s = series(&[42.0]);
        assert_eq!(buy_and_hold(&s, 1_000.0).unwrap(), 1_000.0);
    }

    #[test]
    fn empty_series_is_an_error() {
        let s = PriceSeries::new(vec![]).unwrap();
        assert_eq!(buy_and_hold(&s, 1_000.0), Err(BacktestError::EmptySeries));
    }

    #[test]
    fn non_positive_cash_is_an_error() {
        let s = series(&[1.0, 2.0]);
        assert!(matches!(
            buy_and_hold(&s, 0.0),
            Err(BacktestError::InvalidInitialCash { .. })
        ));
    }

    #[test]
    fn zero_first_close_is_degenerate() {
        let s = series(&[0.0, 2.0]);
        assert!(matches!(
            buy_and_hold(&s, 100.0),
            Err(BacktestError::ArithmeticDegeneracy { index: 0, .. })
        ));
    }
}
