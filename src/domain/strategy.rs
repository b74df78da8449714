//! Trading policies and their parameters.
//!
//! [`StrategyPolicy`] is a closed set of decision rules. Each one looks at the
//! current bar, the indicator rows at `i` and `i-1`, and the position state,
//! and emits at most one [`Action`] per bar.

use crate::domain::indicator::{IndicatorKind, IndicatorRow};
use crate::domain::ohlcv::Bar;
use crate::domain::position::{PositionState, TradeContext};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    None,
    Enter,
    Exit,
    /// Sell `fraction` of current holdings, keeping the rest open.
    PartialExit { fraction: f64 },
}

/// A policy's output for one bar: the action and the trade context to carry
/// forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub context: TradeContext,
}

impl Decision {
    fn keep(state: &PositionState, action: Action) -> Self {
        Decision {
            action,
            context: state.context,
        }
    }
}

/// ATR-scaled profit target and stop for trend following.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRule {
    /// target = entry + target_atr * entry_atr
    pub target_atr: f64,
    /// stop = entry - stop_atr * entry_atr
    pub stop_atr: f64,
    /// Fraction of holdings sold when the target is first reached.
    pub partial_fraction: f64,
}

impl Default for TargetRule {
    fn default() -> Self {
        TargetRule {
            target_atr: 0.5,
            stop_atr: 0.25,
            partial_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyPolicy {
    MovingAverageCrossover,
    VolatilityBreakout { multiplier: f64 },
    TrendFollowWithTargets(TargetRule),
}

impl StrategyPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyPolicy::MovingAverageCrossover => "Moving Average Crossover",
            StrategyPolicy::VolatilityBreakout { .. } => "ATR Strategy",
            StrategyPolicy::TrendFollowWithTargets(_) => "Trend Follow",
        }
    }

    /// Indicator columns that must be defined at a bar before the policy is
    /// consulted there.
    pub fn required_indicators(&self) -> &'static [IndicatorKind] {
        match self {
            StrategyPolicy::MovingAverageCrossover => {
                &[IndicatorKind::ShortMa, IndicatorKind::LongMa]
            }
            StrategyPolicy::VolatilityBreakout { .. } => &[IndicatorKind::Atr],
            StrategyPolicy::TrendFollowWithTargets(_) => &[
                IndicatorKind::EmaShort,
                IndicatorKind::EmaLong,
                IndicatorKind::Atr,
            ],
        }
    }

    pub fn requires_range(&self) -> bool {
        matches!(self, StrategyPolicy::TrendFollowWithTargets(_))
    }

    pub fn decide(
        &self,
        bar: &Bar,
        current: &IndicatorRow,
        prior: Option<&IndicatorRow>,
        state: &PositionState,
    ) -> Decision {
        match self {
            StrategyPolicy::MovingAverageCrossover => {
                Decision::keep(state, crossover_action(current, prior, state))
            }
            StrategyPolicy::VolatilityBreakout { multiplier } => {
                Decision::keep(state, breakout_action(*multiplier, current, prior, state))
            }
            StrategyPolicy::TrendFollowWithTargets(rule) => {
                trend_decision(rule, bar, current, state)
            }
        }
    }
}

impl fmt::Display for StrategyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyPolicy::VolatilityBreakout { multiplier } => {
                write!(f, "{} [{} multiplier]", self.name(), multiplier)
            }
            _ => f.write_str(self.name()),
        }
    }
}

fn crossover_action(
    current: &IndicatorRow,
    prior: Option<&IndicatorRow>,
    state: &PositionState,
) -> Action {
    let Some(prior) = prior else {
        return Action::None;
    };
    let (Some(short), Some(long), Some(prev_short), Some(prev_long)) =
        (current.short_ma, current.long_ma, prior.short_ma, prior.long_ma)
    else {
        return Action::None;
    };

    if state.is_flat() && short > long && prev_short <= prev_long {
        Action::Enter
    } else if state.is_holding() && short < long && prev_short >= prev_long {
        Action::Exit
    } else {
        Action::None
    }
}

fn breakout_action(
    multiplier: f64,
    current: &IndicatorRow,
    prior: Option<&IndicatorRow>,
    state: &PositionState,
) -> Action {
    let (Some(atr), Some(prev_atr)) = (current.atr, prior.and_then(|p| p.atr)) else {
        return Action::None;
    };

    // A spike bar never exits, even when already holding.
    if atr > multiplier * prev_atr {
        if state.cash > 0.0 {
            Action::Enter
        } else {
            Action::None
        }
    } else if state.is_holding() && atr < prev_atr * (multiplier / 2.0) {
        Action::Exit
    } else {
        Action::None
    }
}

fn trend_decision(
    rule: &TargetRule,
    bar: &Bar,
    current: &IndicatorRow,
    state: &PositionState,
) -> Decision {
    if state.is_flat() {
        let context = TradeContext::default();
        let action = match (current.ema_short, current.ema_long) {
            (Some(short), Some(long)) if short > long => Action::Enter,
            _ => Action::None,
        };
        return Decision { action, context };
    }

    let mut context = state.context;
    if context.entry_price.is_none() {
        let (Some(entry), Some(atr)) = (state.last_entry_fill, current.atr) else {
            return Decision::keep(state, Action::None);
        };
        context.entry_price = Some(entry);
        context.entry_atr = Some(atr);
    }

    let (Some(entry), Some(entry_atr)) = (context.entry_price, context.entry_atr) else {
        return Decision {
            action: Action::None,
            context,
        };
    };
    let (Some(high), Some(low)) = (bar.high, bar.low) else {
        return Decision {
            action: Action::None,
            context,
        };
    };

    let target = entry + rule.target_atr * entry_atr;
    let stop = entry - rule.stop_atr * entry_atr;

    let action = if low <= stop {
        Action::Exit
    } else if !context.partial_exit_taken && high >= target {
        context.partial_exit_taken = true;
        Action::PartialExit {
            fraction: rule.partial_fraction,
        }
    } else {
        Action::None
    };

    Decision { action, context }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    MaCrossover,
    Atr,
    TrendFollow,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::MaCrossover => "ma-crossover",
            StrategyKind::Atr => "atr",
            StrategyKind::TrendFollow => "trend-follow",
        }
    }

    pub fn default_atr_period(self) -> usize {
        match self {
            StrategyKind::TrendFollow => 10,
            _ => 14,
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ma-crossover" | "ma" | "ma_crossover" => Ok(StrategyKind::MaCrossover),
            "atr" | "atr-breakout" => Ok(StrategyKind::Atr),
            "trend-follow" | "trend" | "trend_follow" => Ok(StrategyKind::TrendFollow),
            other => Err(format!(
                "unknown strategy `{other}` (expected ma-crossover, atr or trend-follow)"
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to build a policy and its indicator columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    pub kind: StrategyKind,
    pub short_window: usize,
    pub long_window: usize,
    pub atr_multiplier: f64,
    pub atr_period: usize,
    pub ema_short: usize,
    pub ema_long: usize,
}

impl StrategyParams {
    pub fn for_kind(kind: StrategyKind) -> Self {
        StrategyParams {
            kind,
            short_window: 10,
            long_window: 50,
            atr_multiplier: 2.0,
            atr_period: kind.default_atr_period(),
            ema_short: 9,
            ema_long: 21,
        }
    }

    pub fn policy(&self) -> StrategyPolicy {
        match self.kind {
            StrategyKind::MaCrossover => StrategyPolicy::MovingAverageCrossover,
            StrategyKind::Atr => StrategyPolicy::VolatilityBreakout {
                multiplier: self.atr_multiplier,
            },
            StrategyKind::TrendFollow => {
                StrategyPolicy::TrendFollowWithTargets(TargetRule::default())
            }
        }
    }

    /// Short parameter tag, e.g. `[10 - 50]` or `[2 multiplier]`.
    pub fn label(&self) -> String {
        match self.kind {
            StrategyKind::MaCrossover => format!("[{} - {}]", self.short_window, self.long_window),
            StrategyKind::Atr => format!("[{} multiplier]", self.atr_multiplier),
            StrategyKind::TrendFollow => format!(
                "[{} - {} - {}]",
                self.ema_short, self.ema_long, self.atr_period
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(close: f64) -> Bar {
        Bar::close_only(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            close,
        )
    }

    fn candle(high: f64, low: f64, close: f64) -> Bar {
        Bar {
            high: Some(high),
            low: Some(low),
            ..bar(close)
        }
    }

    fn ma(short: f64, long: f64) -> IndicatorRow {
        IndicatorRow {
            short_ma: Some(short),
            long_ma: Some(long),
            ..Default::default()
        }
    }

    fn atr(v: f64) -> IndicatorRow {
        IndicatorRow {
            atr: Some(v),
            ..Default::default()
        }
    }

    fn flat() -> PositionState {
        PositionState::new(10_000.0)
    }

    fn holding() -> PositionState {
        PositionState {
            cash: 0.0,
            holdings: 100.0,
            last_entry_fill: Some(100.0),
            context: TradeContext::default(),
        }
    }

    mod crossover {
        use super::*;

        #[test]
        fn enters_on_upward_cross() {
            let p = StrategyPolicy::MovingAverageCrossover;
            let d = p.decide(&bar(1.0), &ma(2.0, 1.0), Some(&ma(1.0, 2.0)), &flat());
            assert_eq!(d.action, Action::Enter);
        }

        #[test]
        fn prior_equality_counts_as_below() {
            let p = StrategyPolicy::MovingAverageCrossover;
            let d = p.decide(&bar(1.0), &ma(2.0, 1.0), Some(&ma(1.5, 1.5)), &flat());
            assert_eq!(d.action, Action::Enter);
        }

        #[test]
        fn current_equality_does_not_trigger() {
            let p = StrategyPolicy::MovingAverageCrossover;
            let d = p.decide(&bar(1.0), &ma(1.5, 1.5), Some(&ma(1.0, 2.0)), &flat());
            assert_eq!(d.action, Action::None);
            let d = p.decide(&bar(1.0), &ma(1.5, 1.5), Some(&ma(2.0, 1.0)), &holding());
            assert_eq!(d.action, Action::None);
        }

        #[test]
        fn no_entry_while_already_above() {
            let p = StrategyPolicy::MovingAverageCrossover;
            let d = p.decide(&bar(1.0), &ma(3.0, 1.0), Some(&ma(2.0, 1.0)), &flat());
            assert_eq!(d.action, Action::None);
        }

        #[test]
        fn exits_on_downward_cross_only_when_holding() {
            let p = StrategyPolicy::MovingAverageCrossover;
            let cur = ma(1.0, 2.0);
            let prev = ma(2.0, 1.0);
            assert_eq!(p.decide(&bar(1.0), &cur, Some(&prev), &holding()).action, Action::Exit);
            assert_eq!(p.decide(&bar(1.0), &cur, Some(&prev), &flat()).action, Action::None);
        }

        #[test]
        fn first_bar_never_triggers() {
            let p = StrategyPolicy::MovingAverageCrossover;
            let d = p.decide(&bar(1.0), &ma(2.0, 1.0), None, &flat());
            assert_eq!(d.action, Action::None);
        }

        #[test]
        fn undefined_prior_values_do_not_trigger() {
            let p = StrategyPolicy::MovingAverageCrossover;
            let prev = IndicatorRow {
                short_ma: Some(1.0),
                ..Default::default()
            };
            let d = p.decide(&bar(1.0), &ma(2.0, 1.0), Some(&prev), &flat());
            assert_eq!(d.action, Action::None);
        }
    }

    mod breakout {
        use super::*;

        fn policy() -> StrategyPolicy {
            StrategyPolicy::VolatilityBreakout { multiplier: 2.0 }
        }

        #[test]
        fn enters_on_spike() {
            let d = policy().decide(&bar(1.0), &atr(5.0), Some(&atr(2.0)), &flat());
            assert_eq!(d.action, Action::Enter);
        }

        #[test]
        fn spike_must_be_strict() {
            let d = policy().decide(&bar(1.0), &atr(4.0), Some(&atr(2.0)), &flat());
            assert_eq!(d.action, Action::None);
        }

        #[test]
        fn exits_on_contraction() {
            let d = policy().decide(&bar(1.0), &atr(1.0), Some(&atr(2.0)), &holding());
            assert_eq!(d.action, Action::Exit);
        }

        #[test]
        fn spike_while_holding_blocks_exit() {
            // -3 > 2 * -2 and -3 < -2 * (2 / 2): both thresholds hold, the spike branch wins.
            let d = policy().decide(&bar(1.0), &atr(-3.0), Some(&atr(-2.0)), &holding());
            assert_eq!(d.action, Action::None);
        }

        #[test]
        fn multiplier_scales_thresholds() {
            let p = StrategyPolicy::VolatilityBreakout { multiplier: 3.0 };
            assert_eq!(
                p.decide(&bar(1.0), &atr(5.0), Some(&atr(2.0)), &flat()).action,
                Action::None
            );
            // contraction threshold 2 * 1.5 = 3
            assert_eq!(
                p.decide(&bar(1.0), &atr(2.9), Some(&atr(2.0)), &holding()).action,
                Action::Exit
            );
        }

        #[test]
        fn needs_prior_bar() {
            let d = policy().decide(&bar(1.0), &atr(5.0), None, &flat());
            assert_eq!(d.action, Action::None);
        }
    }

    mod trend {
        use super::*;

        fn policy() -> StrategyPolicy {
            StrategyPolicy::TrendFollowWithTargets(TargetRule::default())
        }

        fn row(ema_short: f64, ema_long: f64, atr: f64) -> IndicatorRow {
            IndicatorRow {
                ema_short: Some(ema_short),
                ema_long: Some(ema_long),
                atr: Some(atr),
                ..Default::default()
            }
        }

        #[test]
        fn enters_when_short_ema_above_long() {
            let d = policy().decide(&candle(11.0, 9.0, 10.0), &row(2.0, 1.0, 1.0), None, &flat());
            assert_eq!(d.action, Action::Enter);
            let d = policy().decide(&candle(11.0, 9.0, 10.0), &row(1.0, 1.0, 1.0), None, &flat());
            assert_eq!(d.action, Action::None);
        }

        #[test]
        fn flat_resets_context() {
            let mut state = flat();
            state.context = TradeContext {
                entry_price: Some(50.0),
                entry_atr: Some(3.0),
                partial_exit_taken: true,
            };
            let d = policy().decide(&candle(11.0, 9.0, 10.0), &row(1.0, 2.0, 1.0), None, &state);
            assert_eq!(d.context, TradeContext::default());
        }

        #[test]
        fn captures_entry_on_first_holding_bar() {
            // entry 100, atr 4 → target 102, stop 99
            let d = policy().decide(&candle(101.0, 99.5, 100.0), &row(2.0, 1.0, 4.0), None, &holding());
            assert_eq!(d.action, Action::None);
            assert_eq!(d.context.entry_price, Some(100.0));
            assert_eq!(d.context.entry_atr, Some(4.0));
        }

        #[test]
        fn entry_atr_is_not_recomputed() {
            let mut state = holding();
            state.context.entry_price = Some(100.0);
            state.context.entry_atr = Some(4.0);
            // current atr 40 would move the stop to 90; the captured 4 keeps it at 99
            let d = policy().decide(&candle(101.0, 98.0, 100.0), &row(2.0, 1.0, 40.0), None, &state);
            assert_eq!(d.action, Action::Exit);
            assert_eq!(d.context.entry_atr, Some(4.0));
        }

        #[test]
        fn partial_exit_at_target() {
            let d = policy().decide(&candle(102.0, 99.5, 101.0), &row(2.0, 1.0, 4.0), None, &holding());
            assert_eq!(d.action, Action::PartialExit { fraction: 0.5 });
            assert!(d.context.partial_exit_taken);
        }

        #[test]
        fn partial_exit_only_once() {
            let mut state = holding();
            state.context = TradeContext {
                entry_price: Some(100.0),
                entry_atr: Some(4.0),
                partial_exit_taken: true,
            };
            let d = policy().decide(&candle(110.0, 99.5, 105.0), &row(2.0, 1.0, 4.0), None, &state);
            assert_eq!(d.action, Action::None);
        }

        #[test]
        fn stop_takes_precedence_over_target() {
            // low 98 <= stop 99 and high 103 >= target 102
            let d = policy().decide(&candle(103.0, 98.0, 100.0), &row(2.0, 1.0, 4.0), None, &holding());
            assert_eq!(d.action, Action::Exit);
            assert!(!d.context.partial_exit_taken);
        }

        #[test]
        fn stop_fires_after_partial_exit() {
            let mut state = holding();
            state.holdings = 50.0;
            state.cash = 5_100.0;
            state.context = TradeContext {
                entry_price: Some(100.0),
                entry_atr: Some(4.0),
                partial_exit_taken: true,
            };
            let d = policy().decide(&candle(100.0, 99.0, 99.5), &row(2.0, 1.0, 4.0), None, &state);
            assert_eq!(d.action, Action::Exit);
        }
    }

    #[test]
    fn strategy_kind_parses_aliases() {
        assert_eq!("ma-crossover".parse::<StrategyKind>(), Ok(StrategyKind::MaCrossover));
        assert_eq!("ATR".parse::<StrategyKind>(), Ok(StrategyKind::Atr));
        assert_eq!("trend".parse::<StrategyKind>(), Ok(StrategyKind::TrendFollow));
        assert!("rsi".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn params_build_matching_policy() {
        let params = StrategyParams {
            atr_multiplier: 3.0,
            ..StrategyParams::for_kind(StrategyKind::Atr)
        };
        assert_eq!(
            params.policy(),
            StrategyPolicy::VolatilityBreakout { multiplier: 3.0 }
        );
        assert_eq!(params.atr_period, 14);
        assert_eq!(StrategyParams::for_kind(StrategyKind::TrendFollow).atr_period, 10);
        assert_eq!(params.label(), "[3 multiplier]");
        assert_eq!(
            StrategyParams::for_kind(StrategyKind::MaCrossover).label(),
            "[10 - 50]"
        );
    }

    #[test]
    fn required_indicators_per_policy() {
        assert_eq!(
            StrategyPolicy::MovingAverageCrossover.required_indicators(),
            &[IndicatorKind::ShortMa, IndicatorKind::LongMa]
        );
        assert!(StrategyPolicy::TrendFollowWithTargets(TargetRule::default()).requires_range());
        assert!(!StrategyPolicy::VolatilityBreakout { multiplier: 2.0 }.requires_range());
    }
}
