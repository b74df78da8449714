//! Configuration validation.
//!
//! Checks every known key before any run. Absent keys fall back to their
//! defaults and are always valid; present keys must parse and be in range.

use crate::domain::error::CoinbackError;
use crate::domain::strategy::{StrategyKind, StrategyParams};
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub const DATA_FORMATS: &[&str] = &["csv", "json"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), CoinbackError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), CoinbackError> {
    if let Some(format) = config.get_string("data", "format") {
        let format = format.trim().to_ascii_lowercase();
        if !DATA_FORMATS.contains(&format.as_str()) {
            return Err(invalid(
                "data",
                "format",
                format!("unknown format `{format}` (expected csv or json)"),
            ));
        }
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CoinbackError> {
    if let Some(cash) = parse_key::<f64>(config, "backtest", "initial_cash")? {
        if !cash.is_finite() || cash <= 0.0 {
            return Err(invalid(
                "backtest",
                "initial_cash",
                "initial_cash must be positive",
            ));
        }
    }
    if let Some(rate) = parse_key::<f64>(config, "backtest", "commission_rate")? {
        if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
            return Err(invalid(
                "backtest",
                "commission_rate",
                "commission_rate must be in [0, 1)",
            ));
        }
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), CoinbackError> {
    if let Some(kind) = config.get_string("strategy", "kind") {
        kind.parse::<StrategyKind>()
            .map_err(|reason| invalid("strategy", "kind", reason))?;
    }

    for key in ["short_window", "long_window", "atr_period", "ema_short", "ema_long"] {
        validate_period(config, key)?;
    }

    if let Some(m) = parse_key::<f64>(config, "strategy", "atr_multiplier")? {
        if !m.is_finite() || m <= 0.0 {
            return Err(invalid(
                "strategy",
                "atr_multiplier",
                "atr_multiplier must be positive",
            ));
        }
    }

    let short = parse_key::<usize>(config, "strategy", "short_window")?;
    let long = parse_key::<usize>(config, "strategy", "long_window")?;
    if let (Some(short), Some(long)) = (short, long) {
        if short >= long {
            return Err(invalid(
                "strategy",
                "short_window",
                "short_window must be less than long_window",
            ));
        }
    }

    Ok(())
}

/// Check fully resolved parameters, after command-line overrides are applied.
pub fn validate_strategy_params(params: &StrategyParams) -> Result<(), CoinbackError> {
    let periods = [
        ("short_window", params.short_window),
        ("long_window", params.long_window),
        ("atr_period", params.atr_period),
        ("ema_short", params.ema_short),
        ("ema_long", params.ema_long),
    ];
    for (key, value) in periods {
        if value == 0 {
            return Err(invalid("strategy", key, format!("{key} must be at least 1")));
        }
    }
    if !params.atr_multiplier.is_finite() || params.atr_multiplier <= 0.0 {
        return Err(invalid(
            "strategy",
            "atr_multiplier",
            "atr_multiplier must be positive",
        ));
    }
    if params.kind == StrategyKind::MaCrossover && params.short_window >= params.long_window {
        return Err(invalid(
            "strategy",
            "short_window",
            "short_window must be less than long_window",
        ));
    }
    Ok(())
}

fn validate_period(config: &dyn ConfigPort, key: &str) -> Result<(), CoinbackError> {
    match parse_key::<usize>(config, "strategy", key)? {
        Some(0) => Err(invalid("strategy", key, format!("{key} must be at least 1"))),
        _ => Ok(()),
    }
}

/// Parse `[section] key` if present. A present but unparsable value is an
/// error rather than a silent fallback to the default.
pub fn parse_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, CoinbackError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse `{}`", raw.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CoinbackError {
    CoinbackError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[data]
dir = data
format = csv

[backtest]
initial_cash = 10000
commission_rate = 0.002

[strategy]
kind = ma-crossover
short_window = 10
long_window = 50
atr_multiplier = 2.0
atr_period = 14
ema_short = 9
ema_long = 21

[report]
output_dir = backtest_results
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_config_passes() {
        assert!(validate_config(&make_config("")).is_ok());
    }

    #[test]
    fn initial_cash_zero_fails() {
        let err = validate_config(&make_config("[backtest]\ninitial_cash = 0\n")).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "initial_cash"));
    }

    #[test]
    fn initial_cash_not_a_number_fails() {
        let err = validate_config(&make_config("[backtest]\ninitial_cash = lots\n")).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "initial_cash"));
    }

    #[test]
    fn commission_rate_out_of_range_fails() {
        for bad in ["-0.1", "1", "1.5"] {
            let config = make_config(&format!("[backtest]\ncommission_rate = {bad}\n"));
            let err = validate_config(&config).unwrap_err();
            assert!(
                matches!(err, CoinbackError::ConfigInvalid { ref key, .. } if key == "commission_rate"),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_strategy_fails() {
        let err = validate_config(&make_config("[strategy]\nkind = rsi\n")).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "kind"));
    }

    #[test]
    fn zero_window_fails() {
        let err = validate_config(&make_config("[strategy]\nema_long = 0\n")).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "ema_long"));
    }

    #[test]
    fn negative_window_fails_to_parse() {
        let err = validate_config(&make_config("[strategy]\nshort_window = -3\n")).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "short_window"));
    }

    #[test]
    fn short_window_must_be_below_long() {
        let config = make_config("[strategy]\nshort_window = 50\nlong_window = 10\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "short_window"));
    }

    #[test]
    fn non_positive_multiplier_fails() {
        let err = validate_config(&make_config("[strategy]\natr_multiplier = 0\n")).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "atr_multiplier"));
    }

    #[test]
    fn unknown_format_fails() {
        let err = validate_config(&make_config("[data]\nformat = parquet\n")).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "format"));
    }

    #[test]
    fn parse_key_reports_absent_as_none() {
        let config = make_config("[strategy]\nshort_window = 7\n");
        assert_eq!(parse_key::<usize>(&config, "strategy", "short_window").unwrap(), Some(7));
        assert_eq!(parse_key::<usize>(&config, "strategy", "long_window").unwrap(), None);
    }

    #[test]
    fn resolved_params_are_checked() {
        let ok = StrategyParams::for_kind(StrategyKind::MaCrossover);
        assert!(validate_strategy_params(&ok).is_ok());

        let inverted = StrategyParams {
            short_window: 60,
            ..ok
        };
        let err = validate_strategy_params(&inverted).unwrap_err();
        assert!(matches!(err, CoinbackError::ConfigInvalid { key, .. } if key == "short_window"));

        // window order only matters for the crossover
        let atr = StrategyParams {
            short_window: 60,
            ..StrategyParams::for_kind(StrategyKind::Atr)
        };
        assert!(validate_strategy_params(&atr).is_ok());

        let zero_period = StrategyParams {
            atr_period: 0,
            ..atr
        };
        assert!(validate_strategy_params(&zero_period).is_err());
    }
}
