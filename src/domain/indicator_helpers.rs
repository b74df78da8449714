//! Building indicator columns for a strategy and aligning them with the
//! series.

use crate::domain::error::BacktestError;
use crate::domain::indicator::atr::{calculate_close_atr, calculate_range_atr};
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorKind, IndicatorSet};
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::{StrategyKind, StrategyParams};

/// Compute the columns `params.kind` consumes, one value per bar.
pub fn compute_indicators(
    series: &PriceSeries,
    params: &StrategyParams,
) -> Result<IndicatorSet, BacktestError> {
    let closes = series.closes();
    let mut set = IndicatorSet::new(series.len());

    match params.kind {
        StrategyKind::MaCrossover => {
            set.insert(
                IndicatorKind::ShortMa,
                calculate_sma(&closes, params.short_window),
            )?;
            set.insert(
                IndicatorKind::LongMa,
                calculate_sma(&closes, params.long_window),
            )?;
        }
        StrategyKind::Atr => {
            set.insert(
                IndicatorKind::Atr,
                calculate_close_atr(&closes, params.atr_period),
            )?;
        }
        StrategyKind::TrendFollow => {
            set.insert(
                IndicatorKind::EmaShort,
                calculate_ema(&closes, params.ema_short),
            )?;
            set.insert(
                IndicatorKind::EmaLong,
                calculate_ema(&closes, params.ema_long),
            )?;
            set.insert(
                IndicatorKind::Atr,
                calculate_range_atr(&series.ranges(), params.atr_period),
            )?;
        }
    }

    Ok(set)
}

/// Drop leading bars where any of `required` is still warming up.
///
/// Returns [`BacktestError::EmptySeries`] when no bar has every required
/// column defined.
pub fn trim_warmup(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    required: &[IndicatorKind],
) -> Result<(PriceSeries, IndicatorSet), BacktestError> {
    if indicators.len() != series.len() {
        return Err(BacktestError::Alignment {
            indicator: required
                .first()
                .map(|k| k.name().to_string())
                .unwrap_or_else(|| "indicators".to_string()),
            expected: series.len(),
            actual: indicators.len(),
        });
    }
    let start = indicators
        .first_complete_index(required)
        .ok_or(BacktestError::EmptySeries)?;
    Ok((series.slice_from(start), indicators.slice_from(start)))
}
