//! Ordered price series.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDateTime;

/// Ordered bars with strictly increasing timestamps.
///
/// Construction validates every bar, so holders of a `PriceSeries` can rely on
/// ordering and the per-bar invariants without re-checking them.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, BacktestError> {
        for (i, bar) in bars.iter().enumerate() {
            bar.check().map_err(|reason| BacktestError::InvalidBar {
                index: i,
                timestamp: bar.timestamp,
                reason,
            })?;
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(BacktestError::NonMonotonicTimestamp {
                    index: i,
                    timestamp: bar.timestamp,
                    previous: bars[i - 1].timestamp,
                });
            }
        }

        Ok(Self { bars })
    }

    /// Build a close-only series from `(timestamp, close)` pairs.
    pub fn from_closes(points: &[(NaiveDateTime, f64)]) -> Result<Self, BacktestError> {
        Self::new(
            points
                .iter()
                .map(|&(timestamp, close)| Bar::close_only(timestamp, close))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Per-bar high - low; `None` for close-only bars.
    pub fn ranges(&self) -> Vec<Option<f64>> {
        self.bars.iter().map(Bar::range).collect()
    }

    /// True when every bar carries a high/low range.
    pub fn has_ranges(&self) -> bool {
        !self.bars.is_empty() && self.bars.iter().all(Bar::has_range)
    }

    /// First bar lacking a high/low range, if any.
    pub fn first_missing_range(&self) -> Option<(usize, &Bar)> {
        self.bars.iter().enumerate().find(|(_, b)| !b.has_range())
    }

    /// Sub-series starting at `start`. Ordering is inherited, so no
    /// re-validation is needed.
    pub fn slice_from(&self, start: usize) -> PriceSeries {
        PriceSeries {
            bars: self.bars.iter().skip(start).cloned().collect(),
        }
    }
}
