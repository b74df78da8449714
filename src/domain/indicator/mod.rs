//! Indicator columns aligned to a price series.
//!
//! - `IndicatorKind`: the named columns a strategy can consult
//! - `IndicatorRow`: every column's value at one bar
//! - `IndicatorSet`: the aligned columns, one optional value per bar
//!
//! A value is undefined (`None`) while an indicator is still warming up.
//! Non-finite values are treated as undefined as well.

pub mod atr;
pub mod ema;
pub mod sma;

use crate::domain::error::BacktestError;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorKind {
    ShortMa,
    LongMa,
    Atr,
    EmaShort,
    EmaLong,
}

impl IndicatorKind {
    pub fn name(self) -> &'static str {
        match self {
            IndicatorKind::ShortMa => "short_ma",
            IndicatorKind::LongMa => "long_ma",
            IndicatorKind::Atr => "atr",
            IndicatorKind::EmaShort => "ema_short",
            IndicatorKind::EmaLong => "ema_long",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Indicator values at a single bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorRow {
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
    pub atr: Option<f64>,
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
}

impl IndicatorRow {
    pub fn get(&self, kind: IndicatorKind) -> Option<f64> {
        match kind {
            IndicatorKind::ShortMa => self.short_ma,
            IndicatorKind::LongMa => self.long_ma,
            IndicatorKind::Atr => self.atr,
            IndicatorKind::EmaShort => self.ema_short,
            IndicatorKind::EmaLong => self.ema_long,
        }
    }

    fn set(&mut self, kind: IndicatorKind, value: Option<f64>) {
        match kind {
            IndicatorKind::ShortMa => self.short_ma = value,
            IndicatorKind::LongMa => self.long_ma = value,
            IndicatorKind::Atr => self.atr = value,
            IndicatorKind::EmaShort => self.ema_short = value,
            IndicatorKind::EmaLong => self.ema_long = value,
        }
    }

    /// True when every listed indicator is defined.
    pub fn has_all(&self, kinds: &[IndicatorKind]) -> bool {
        kinds.iter().all(|&k| self.get(k).is_some())
    }
}

/// Precomputed indicator columns, each exactly `len` values long.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    len: usize,
    columns: BTreeMap<IndicatorKind, Vec<Option<f64>>>,
}

impl IndicatorSet {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    /// Add or replace a column. Fails if its length differs from the set's.
    pub fn insert(
        &mut self,
        kind: IndicatorKind,
        values: Vec<Option<f64>>,
    ) -> Result<(), BacktestError> {
        if values.len() != self.len {
            return Err(BacktestError::Alignment {
                indicator: kind.name().to_string(),
                expected: self.len,
                actual: values.len(),
            });
        }
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        self.columns.insert(kind, values);
        Ok(())
    }

    pub fn with_column(
        mut self,
        kind: IndicatorKind,
        values: Vec<Option<f64>>,
    ) -> Result<Self, BacktestError> {
        self.insert(kind, values)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, kind: IndicatorKind) -> bool {
        self.columns.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = IndicatorKind> + '_ {
        self.columns.keys().copied()
    }

    pub fn column(&self, kind: IndicatorKind) -> Option<&[Option<f64>]> {
        self.columns.get(&kind).map(Vec::as_slice)
    }

    pub fn value(&self, kind: IndicatorKind, index: usize) -> Option<f64> {
        self.columns.get(&kind)?.get(index).copied().flatten()
    }

    pub fn row(&self, index: usize) -> IndicatorRow {
        let mut row = IndicatorRow::default();
        for (&kind, values) in &self.columns {
            row.set(kind, values.get(index).copied().flatten());
        }
        row
    }

    /// First index at which every listed indicator is defined.
    pub fn first_complete_index(&self, kinds: &[IndicatorKind]) -> Option<usize> {
        (0..self.len).find(|&i| kinds.iter().all(|&k| self.value(k, i).is_some()))
    }

    /// Drop the first `start` values of every column.
    pub fn slice_from(&self, start: usize) -> IndicatorSet {
        let columns = self
            .columns
            .iter()
            .map(|(&kind, values)| (kind, values.iter().skip(start).copied().collect()))
            .collect();
        IndicatorSet {
            len: self.len.saturating_sub(start),
            columns,
        }
    }
}

/// Wrap raw values as a fully defined column.
pub fn defined(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|&v| Some(v)).collect()
}
