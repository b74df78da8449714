//! Cash/holdings state threaded through the simulation.

/// Per-position bookkeeping used by policies that manage an open trade.
///
/// `entry_price` and `entry_atr` are captured once, on the first bar after an
/// entry, and stay fixed for the life of the position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeContext {
    pub entry_price: Option<f64>,
    pub entry_atr: Option<f64>,
    pub partial_exit_taken: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub cash: f64,
    /// Units of the asset held.
    pub holdings: f64,
    /// Fill price of the most recent entry. Written by the engine only.
    pub last_entry_fill: Option<f64>,
    pub context: TradeContext,
}

impl PositionState {
    pub fn new(initial_cash: f64) -> Self {
        PositionState {
            cash: initial_cash,
            holdings: 0.0,
            last_entry_fill: None,
            context: TradeContext::default(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.holdings <= 0.0
    }

    pub fn is_holding(&self) -> bool {
        self.holdings > 0.0
    }

    /// cash + holdings * price
    pub fn value(&self, price: f64) -> f64 {
        self.cash + self.holdings * price
    }
}
