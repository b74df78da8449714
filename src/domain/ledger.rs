//! Trade ledger and equity curve.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Enter,
    Exit,
    PartialExit,
}

impl TradeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeAction::Enter => "ENTER",
            TradeAction::Exit => "EXIT",
            TradeAction::PartialExit => "PARTIAL_EXIT",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed trade.
///
/// `resulting_balance` is the holdings after an `Enter` or `PartialExit`, and
/// the cash after an `Exit`.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub timestamp: NaiveDateTime,
    pub action: TradeAction,
    pub price: f64,
    pub resulting_balance: f64,
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {:.2}, {:.6})",
            self.timestamp, self.action, self.price, self.resulting_balance
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    /// Close the portfolio was valued at.
    pub close: f64,
    pub equity: f64,
}

/// Append-only record of one simulation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    trades: Vec<TradeEvent>,
    equity_curve: Vec<EquityPoint>,
}

impl Ledger {
    pub fn with_capacity(bars: usize) -> Self {
        Ledger {
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(bars),
        }
    }

    pub fn record_trade(&mut self, trade: TradeEvent) {
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, close: f64, equity: f64) {
        self.equity_curve.push(EquityPoint {
            timestamp,
            close,
            equity,
        });
    }

    pub fn trades(&self) -> &[TradeEvent] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn into_parts(self) -> (Vec<TradeEvent>, Vec<EquityPoint>) {
        (self.trades, self.equity_curve)
    }
}
