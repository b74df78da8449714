//! Backtest engine and event loop.
//!
//! A run walks the series once, in timestamp order. At every bar the policy
//! sees only data up to and including that bar; its action is filled at the
//! bar's close and the portfolio is then valued at the same close. Every bar
//! contributes exactly one equity point and at most one trade.

use tracing::{debug, info};

use crate::domain::baseline::buy_and_hold;
use crate::domain::error::BacktestError;
use crate::domain::execution::{ExecutionConfig, apply_action};
use crate::domain::indicator::{IndicatorRow, IndicatorSet};
use crate::domain::indicator_helpers::{compute_indicators, trim_warmup};
use crate::domain::ledger::{EquityPoint, Ledger, TradeEvent};
use crate::domain::position::PositionState;
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::{StrategyParams, StrategyPolicy};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub commission_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: 10_000.0,
            commission_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_rate: self.commission_rate,
        }
    }

    /// Positive finite cash and a commission rate in `[0, 1)`.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(BacktestError::InvalidInitialCash {
                value: self.initial_cash,
            });
        }
        self.execution().validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy: String,
    pub initial_cash: f64,
    pub final_value: f64,
    pub trades: Vec<TradeEvent>,
    /// One point per simulated bar.
    pub equity_curve: Vec<EquityPoint>,
    pub baseline_value: f64,
    /// Bars valued without consulting the policy because a required
    /// indicator was undefined.
    pub skipped_bars: usize,
}

impl BacktestResult {
    pub fn outperformed(&self) -> bool {
        self.final_value > self.baseline_value
    }

    pub fn total_return(&self) -> f64 {
        (self.final_value - self.initial_cash) / self.initial_cash
    }

    pub fn baseline_return(&self) -> f64 {
        (self.baseline_value - self.initial_cash) / self.initial_cash
    }
}

/// Simulate `policy` over `series`.
///
/// All inputs are validated before the first bar is processed; a run either
/// completes over the whole series or fails without partial output.
pub fn run_backtest(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    policy: &StrategyPolicy,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    validate_inputs(series, indicators, policy, config)?;
    let execution = config.execution();
    let required = policy.required_indicators();

    info!(
        strategy = %policy,
        bars = series.len(),
        initial_cash = config.initial_cash,
        "running backtest"
    );

    let mut state = PositionState::new(config.initial_cash);
    let mut ledger = Ledger::with_capacity(series.len());
    let mut prior: Option<IndicatorRow> = None;
    let mut skipped_bars = 0usize;

    for (i, bar) in series.bars().iter().enumerate() {
        let row = indicators.row(i);

        if row.has_all(required) {
            let decision = policy.decide(bar, &row, prior.as_ref(), &state);
            state.context = decision.context;
            if let Some(trade) = apply_action(&mut state, decision.action, bar, i, &execution)? {
                ledger.record_trade(trade);
            }
        } else {
            skipped_bars += 1;
        }

        ledger.record_equity(bar.timestamp, bar.close, state.value(bar.close));
        prior = Some(row);
    }

    let final_value = ledger
        .equity_curve()
        .last()
        .map_or(config.initial_cash, |point| point.equity);
    let baseline_value = buy_and_hold(series, config.initial_cash)?;

    debug!(
        trades = ledger.trades().len(),
        skipped_bars,
        final_value,
        baseline_value,
        "backtest complete"
    );
    let (trades, equity_curve) = ledger.into_parts();

    Ok(BacktestResult {
        strategy: policy.to_string(),
        initial_cash: config.initial_cash,
        final_value,
        trades,
        equity_curve,
        baseline_value,
        skipped_bars,
    })
}

/// Compute indicators for `params`, drop the warmup bars, and run.
pub fn run_strategy(
    series: &PriceSeries,
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    let policy = params.policy();
    let indicators = compute_indicators(series, params)?;
    let (series, indicators) = trim_warmup(series, &indicators, policy.required_indicators())?;
    run_backtest(&series, &indicators, &policy, config)
}

fn validate_inputs(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    policy: &StrategyPolicy,
    config: &BacktestConfig,
) -> Result<(), BacktestError> {
    config.validate()?;

    if series.is_empty() {
        return Err(BacktestError::EmptySeries);
    }

    for &kind in policy.required_indicators() {
        if !indicators.contains(kind) {
            return Err(BacktestError::MissingIndicator {
                indicator: kind.name().to_string(),
            });
        }
    }

    if indicators.len() != series.len() {
        let indicator = indicators
            .kinds()
            .next()
            .map(|k| k.name().to_string())
            .unwrap_or_else(|| "indicators".to_string());
        return Err(BacktestError::Alignment {
            indicator,
            expected: series.len(),
            actual: indicators.len(),
        });
    }

    if !policy.requires_range() {
        return Ok(());
    }
    match series.first_missing_range() {
        Some((index, bar)) => {
            let column = if bar.high.is_none() { "high" } else { "low" };
            Err(BacktestError::MissingColumn {
                column: column.to_string(),
                index,
                timestamp: bar.timestamp,
            })
        }
        None => Ok(()),
    }
}
