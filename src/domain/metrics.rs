//! Performance metrics for a completed run.

use super::backtest::BacktestResult;
use super::ledger::{EquityPoint, TradeAction};

/// Crypto markets trade every calendar day.
pub const CRYPTO_PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub baseline_return: f64,
    /// Strategy return minus buy-and-hold return.
    pub excess_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of consecutive bars below the running peak.
    pub max_drawdown_duration: usize,
    pub entries: usize,
    pub exits: usize,
    pub partial_exits: usize,
    pub bars: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, periods_per_year: f64) -> Self {
        let equity_curve = &result.equity_curve;
        let total_return = result.total_return();
        let baseline_return = result.baseline_return();

        let periods = equity_curve.len() as f64;
        let years = periods / periods_per_year;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, periods_per_year);

        let count = |action| result.trades.iter().filter(|t| t.action == action).count();

        Metrics {
            total_return,
            baseline_return,
            excess_return: total_return - baseline_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            entries: count(TradeAction::Enter),
            exits: count(TradeAction::Exit),
            partial_exits: count(TradeAction::PartialExit),
            bars: equity_curve.len(),
        }
    }

    /// (name, value) pairs in report order.
    pub fn summary_rows(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("total_return", self.total_return),
            ("baseline_return", self.baseline_return),
            ("excess_return", self.excess_return),
            ("annualized_return", self.annualized_return),
            ("sharpe_ratio", self.sharpe_ratio),
            ("sortino_ratio", self.sortino_ratio),
            ("max_drawdown", self.max_drawdown),
            ("max_drawdown_duration", self.max_drawdown_duration as f64),
            ("entries", self.entries as f64),
            ("exits", self.exits as f64),
            ("partial_exits", self.partial_exits as f64),
            ("bars", self.bars as f64),
        ]
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], periods_per_year: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let annualizer = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 {
        (mean / stddev) * annualizer
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum();
    let downside_stddev = (downside_sq / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (mean / downside_stddev) * annualizer
    } else {
        0.0
    };

    (sharpe, sortino)
}
