//! Fill simulation.
//!
//! Applies a policy's [`Action`] to the [`PositionState`] at the current bar's
//! close. The commission rate is modelled as a fill price adjustment: buys
//! fill at `close * (1 + rate)`, sells at `close * (1 - rate)`.

use crate::domain::error::BacktestError;
use crate::domain::ledger::{TradeAction, TradeEvent};
use crate::domain::ohlcv::Bar;
use crate::domain::position::PositionState;
use crate::domain::strategy::Action;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    pub commission_rate: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_rate: 0.0,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        let rate = self.commission_rate;
        if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
            return Err(BacktestError::InvalidCommission { value: rate });
        }
        Ok(())
    }
}

/// Buy fill: market_price * (1 + commission_rate)
pub fn entry_fill_price(market_price: f64, config: &ExecutionConfig) -> f64 {
    market_price * (1.0 + config.commission_rate)
}

/// Sell fill: market_price * (1 - commission_rate)
pub fn exit_fill_price(market_price: f64, config: &ExecutionConfig) -> f64 {
    market_price * (1.0 - config.commission_rate)
}

/// Apply `action` at `bar`, returning the trade it produced.
///
/// Actions that cannot change the state (entering with no cash, exiting with
/// no holdings) are ignored and produce no trade.
pub fn apply_action(
    state: &mut PositionState,
    action: Action,
    bar: &Bar,
    index: usize,
    config: &ExecutionConfig,
) -> Result<Option<TradeEvent>, BacktestError> {
    match action {
        Action::None => Ok(None),
        Action::Enter => enter(state, bar, index, config),
        Action::Exit => Ok(exit(state, bar, config)),
        Action::PartialExit { fraction } => Ok(partial_exit(state, fraction, bar, config)),
    }
}

fn enter(
    state: &mut PositionState,
    bar: &Bar,
    index: usize,
    config: &ExecutionConfig,
) -> Result<Option<TradeEvent>, BacktestError> {
    if state.cash <= 0.0 {
        return Ok(None);
    }

    let fill = entry_fill_price(bar.close, config);
    if fill <= 0.0 || !fill.is_finite() {
        return Err(BacktestError::ArithmeticDegeneracy {
            index,
            timestamp: bar.timestamp,
            reason: format!("cannot size an entry at close price {}", bar.close),
        });
    }

    state.holdings += state.cash / fill;
    state.cash = 0.0;
    state.last_entry_fill = Some(fill);

    Ok(Some(TradeEvent {
        timestamp: bar.timestamp,
        action: TradeAction::Enter,
        price: fill,
        resulting_balance: state.holdings,
    }))
}

fn exit(state: &mut PositionState, bar: &Bar, config: &ExecutionConfig) -> Option<TradeEvent> {
    if state.is_flat() {
        return None;
    }

    let fill = exit_fill_price(bar.close, config);
    state.cash += state.holdings * fill;
    state.holdings = 0.0;

    Some(TradeEvent {
        timestamp: bar.timestamp,
        action: TradeAction::Exit,
        price: fill,
        resulting_balance: state.cash,
    })
}

fn partial_exit(
    state: &mut PositionState,
    fraction: f64,
    bar: &Bar,
    config: &ExecutionConfig,
) -> Option<TradeEvent> {
    if state.is_flat() || fraction <= 0.0 {
        return None;
    }
    if fraction >= 1.0 {
        return exit(state, bar, config);
    }

    let fill = exit_fill_price(bar.close, config);
    let sold = state.holdings * fraction;
    state.cash += sold * fill;
    state.holdings -= sold;

    Some(TradeEvent {
        timestamp: bar.timestamp,
        action: TradeAction::PartialExit,
        price: fill,
        resulting_balance: state.holdings,
    })
}
