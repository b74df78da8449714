//! Parameter grid sweeps.
//!
//! Each combination is an independent run over the same immutable series.
//! Runs share no mutable state, so they may execute in parallel; a failing
//! combination is recorded and does not stop the others.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::backtest::{BacktestConfig, BacktestResult, run_strategy};
use crate::domain::error::BacktestError;
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::{StrategyKind, StrategyParams};

#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    /// Strategy kind and the values of every parameter not swept.
    pub base: StrategyParams,
    pub short_windows: Vec<usize>,
    pub long_windows: Vec<usize>,
    pub atr_multipliers: Vec<f64>,
}

impl ParamGrid {
    pub fn new(base: StrategyParams) -> Self {
        ParamGrid {
            base,
            short_windows: Vec::new(),
            long_windows: Vec::new(),
            atr_multipliers: Vec::new(),
        }
    }

    /// Expand into concrete parameter sets for `base.kind`.
    ///
    /// An empty axis falls back to the base value. Moving-average pairs with
    /// `short >= long` are skipped.
    pub fn combinations(&self) -> Vec<StrategyParams> {
        match self.base.kind {
            StrategyKind::MaCrossover => {
                let shorts = axis(&self.short_windows, self.base.short_window);
                let longs = axis(&self.long_windows, self.base.long_window);
                let mut out = Vec::new();
                for &short in &shorts {
                    for &long in &longs {
                        if short >= long {
                            continue;
                        }
                        out.push(StrategyParams {
                            short_window: short,
                            long_window: long,
                            ..self.base
                        });
                    }
                }
                out
            }
            StrategyKind::Atr => axis(&self.atr_multipliers, self.base.atr_multiplier)
                .into_iter()
                .map(|m| StrategyParams {
                    atr_multiplier: m,
                    ..self.base
                })
                .collect(),
            StrategyKind::TrendFollow => vec![self.base],
        }
    }
}

fn axis<T: Copy>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub params: StrategyParams,
    pub result: Result<BacktestResult, BacktestError>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepReport {
    /// One outcome per combination, in grid order.
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful runs, best final value first.
    pub fn ranked(&self) -> Vec<(&StrategyParams, &BacktestResult)> {
        let mut ok: Vec<_> = self
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (&o.params, r)))
            .collect();
        ok.sort_by(|a, b| {
            b.1.final_value
                .partial_cmp(&a.1.final_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ok
    }

    pub fn failures(&self) -> Vec<(&StrategyParams, &BacktestError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.params, e)))
            .collect()
    }

    pub fn best(&self) -> Option<(&StrategyParams, &BacktestResult)> {
        self.ranked().into_iter().next()
    }
}

/// Run every combination in `grid` against `series`.
pub fn run_sweep(
    series: &PriceSeries,
    grid: &ParamGrid,
    config: &BacktestConfig,
    parallel: bool,
) -> SweepReport {
    let combinations = grid.combinations();
    info!(
        strategy = %grid.base.kind,
        combinations = combinations.len(),
        parallel,
        "starting sweep"
    );

    let run = |params: &StrategyParams| {
        let result = run_strategy(series, params, config);
        if let Err(e) = &result {
            warn!(params = %params.label(), error = %e, "sweep combination failed");
        }
        SweepOutcome {
            params: *params,
            result,
        }
    };

    let outcomes = if parallel {
        combinations.par_iter().map(run).collect()
    } else {
        combinations.iter().map(run).collect()
    };

    SweepReport { outcomes }
}
