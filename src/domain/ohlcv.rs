//! Price bar representation.
//!
//! Provider dumps carry either a close-only price or full open/high/low/close
//! candles, so every field except `close` is optional.

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
}

impl Bar {
    pub fn close_only(timestamp: NaiveDateTime, close: f64) -> Self {
        Bar {
            timestamp,
            open: None,
            high: None,
            low: None,
            close,
        }
    }

    pub fn ohlc(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Bar {
            timestamp,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close,
        }
    }

    pub fn has_range(&self) -> bool {
        self.high.is_some() && self.low.is_some()
    }

    /// high - low, when both are present.
    pub fn range(&self) -> Option<f64> {
        Some(self.high? - self.low?)
    }

    /// Check the per-bar invariants: finite, non-negative close and
    /// `high >= low >= 0` when a range is present. A zero close is accepted
    /// here; it only becomes fatal when the engine has to divide by it.
    pub fn check(&self) -> Result<(), String> {
        if !self.close.is_finite() || self.close < 0.0 {
            return Err(format!("close must be a non-negative number, got {}", self.close));
        }
        if let Some(open) = self.open.filter(|o| !o.is_finite() || *o < 0.0) {
            return Err(format!("open must be a non-negative number, got {open}"));
        }
        match (self.high, self.low) {
            (Some(high), Some(low)) => {
                if !high.is_finite() || !low.is_finite() {
                    return Err("high/low must be finite".into());
                }
                if low < 0.0 {
                    return Err(format!("low must be non-negative, got {low}"));
                }
                if high < low {
                    return Err(format!("high {high} is below low {low}"));
                }
                Ok(())
            }
            (None, None) => Ok(()),
            _ => Err("high and low must be given together".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn range_requires_high_and_low() {
        let bar = Bar::ohlc(ts(), 100.0, 110.0, 90.0, 105.0);
        assert!(bar.has_range());
        assert!((bar.range().unwrap() - 20.0).abs() < f64::EPSILON);

        let close_only = Bar::close_only(ts(), 105.0);
        assert!(!close_only.has_range());
        assert!(close_only.range().is_none());
    }

    #[test]
    fn check_accepts_valid_bars() {
        assert!(Bar::ohlc(ts(), 100.0, 110.0, 90.0, 105.0).check().is_ok());
        assert!(Bar::close_only(ts(), 105.0).check().is_ok());
        // flat candle
        assert!(Bar::ohlc(ts(), 1.0, 1.0, 1.0, 1.0).check().is_ok());
    }

    #[test]
    fn check_rejects_inverted_range() {
        let bar = Bar::ohlc(ts(), 100.0, 90.0, 110.0, 105.0);
        assert!(bar.check().unwrap_err().contains("below low"));
    }

    #[test]
    fn check_rejects_negative_values() {
        assert!(Bar::close_only(ts(), -1.0).check().is_err());
        assert!(Bar::ohlc(ts(), 1.0, 2.0, -0.5, 1.0).check().is_err());
        assert!(Bar::close_only(ts(), f64::NAN).check().is_err());
    }

    #[test]
    fn check_rejects_half_range() {
        let bar = Bar {
            high: Some(10.0),
            ..Bar::close_only(ts(), 5.0)
        };
        assert!(bar.check().is_err());
    }

    #[test]
    fn zero_close_is_not_an_invariant_violation() {
        assert!(Bar::close_only(ts(), 0.0).check().is_ok());
    }
}
