//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_adapter::JsonAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_strategy};
use crate::domain::config_validation::{parse_key, validate_config, validate_strategy_params};
use crate::domain::error::CoinbackError;
use crate::domain::metrics::{CRYPTO_PERIODS_PER_YEAR, Metrics};
use crate::domain::strategy::{StrategyKind, StrategyParams};
use crate::domain::sweep::{ParamGrid, run_sweep};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUTPUT_DIR: &str = "backtest_results";

#[derive(Parser, Debug)]
#[command(name = "coinback", about = "Single-asset crypto strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default, Clone)]
pub struct DataArgs {
    /// Directory holding the price files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Price file format: csv or json
    #[arg(long)]
    pub format: Option<String>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct StrategyArgs {
    /// ma-crossover, atr or trend-follow
    #[arg(long)]
    pub strategy: Option<String>,
    #[arg(long)]
    pub short: Option<usize>,
    #[arg(long)]
    pub long: Option<usize>,
    #[arg(long)]
    pub atr_multiplier: Option<f64>,
    #[arg(long)]
    pub atr_period: Option<usize>,
    #[arg(long)]
    pub ema_short: Option<usize>,
    #[arg(long)]
    pub ema_long: Option<usize>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct CashArgs {
    #[arg(long)]
    pub initial_cash: Option<f64>,
    /// Proportional commission per fill, e.g. 0.002
    #[arg(long)]
    pub commission: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy over a coin's price history
    Backtest {
        coin: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        strategy: StrategyArgs,
        #[command(flatten)]
        cash: CashArgs,
        /// Report output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_report: bool,
    },
    /// Run a parameter grid and rank the results
    Sweep {
        coin: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        strategy: StrategyArgs,
        #[command(flatten)]
        cash: CashArgs,
        #[arg(long, value_delimiter = ',')]
        short_windows: Vec<usize>,
        #[arg(long, value_delimiter = ',')]
        long_windows: Vec<usize>,
        #[arg(long, value_delimiter = ',')]
        atr_multipliers: Vec<f64>,
        /// Run combinations one at a time
        #[arg(long)]
        sequential: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data available for a coin, or list coins
    Info {
        coin: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        data: DataArgs,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            coin,
            config,
            data,
            strategy,
            cash,
            output,
            no_report,
        } => run_backtest(
            &coin,
            config.as_deref(),
            &data,
            &strategy,
            &cash,
            output.as_deref(),
            no_report,
        ),
        Command::Sweep {
            coin,
            config,
            data,
            strategy,
            cash,
            short_windows,
            long_windows,
            atr_multipliers,
            sequential,
        } => {
            let axes = SweepAxes {
                short_windows,
                long_windows,
                atr_multipliers,
            };
            run_sweep_command(
                &coin,
                config.as_deref(),
                &data,
                &strategy,
                &cash,
                axes,
                !sequential,
            )
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { coin, config, data } => {
            run_info(coin.as_deref(), config.as_deref(), &data)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate the INI file at `path`; with no path every setting uses
/// its default.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, CoinbackError> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    overrides: &CashArgs,
) -> Result<BacktestConfig, CoinbackError> {
    let defaults = BacktestConfig::default();
    let initial_cash = match overrides.initial_cash {
        Some(v) => v,
        None => parse_key(config, "backtest", "initial_cash")?.unwrap_or(defaults.initial_cash),
    };
    let commission_rate = match overrides.commission {
        Some(v) => v,
        None => {
            parse_key(config, "backtest", "commission_rate")?.unwrap_or(defaults.commission_rate)
        }
    };
    Ok(BacktestConfig {
        initial_cash,
        commission_rate,
    })
}

pub fn build_strategy_params(
    config: &dyn ConfigPort,
    overrides: &StrategyArgs,
) -> Result<StrategyParams, CoinbackError> {
    let kind_name = overrides
        .strategy
        .clone()
        .or_else(|| config.get_string("strategy", "kind"));
    let kind = match kind_name {
        Some(name) => name
            .parse::<StrategyKind>()
            .map_err(|reason| CoinbackError::ConfigInvalid {
                section: "strategy".into(),
                key: "kind".into(),
                reason,
            })?,
        None => StrategyKind::MaCrossover,
    };

    let base = StrategyParams::for_kind(kind);
    let period = |cli: Option<usize>, key: &str, default: usize| -> Result<usize, CoinbackError> {
        match cli {
            Some(v) => Ok(v),
            None => Ok(parse_key(config, "strategy", key)?.unwrap_or(default)),
        }
    };

    let params = StrategyParams {
        kind,
        short_window: period(overrides.short, "short_window", base.short_window)?,
        long_window: period(overrides.long, "long_window", base.long_window)?,
        atr_period: period(overrides.atr_period, "atr_period", base.atr_period)?,
        ema_short: period(overrides.ema_short, "ema_short", base.ema_short)?,
        ema_long: period(overrides.ema_long, "ema_long", base.ema_long)?,
        atr_multiplier: match overrides.atr_multiplier {
            Some(v) => v,
            None => parse_key(config, "strategy", "atr_multiplier")?.unwrap_or(base.atr_multiplier),
        },
    };
    validate_strategy_params(&params)?;
    Ok(params)
}

pub fn build_data_port(
    config: &dyn ConfigPort,
    args: &DataArgs,
) -> Result<Box<dyn DataPort>, CoinbackError> {
    let dir = args
        .data_dir
        .clone()
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let format = args
        .format
        .clone()
        .or_else(|| config.get_string("data", "format"))
        .unwrap_or_else(|| "csv".to_string());

    match format.trim().to_ascii_lowercase().as_str() {
        "csv" => Ok(Box::new(CsvAdapter::new(dir))),
        "json" => Ok(Box::new(JsonAdapter::new(dir))),
        other => Err(CoinbackError::ConfigInvalid {
            section: "data".into(),
            key: "format".into(),
            reason: format!("unknown format `{other}` (expected csv or json)"),
        }),
    }
}

pub fn resolve_output_dir(config: &dyn ConfigPort, output: Option<&Path>) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn run_backtest(
    coin: &str,
    config_path: Option<&Path>,
    data: &DataArgs,
    strategy: &StrategyArgs,
    cash: &CashArgs,
    output: Option<&Path>,
    no_report: bool,
) -> Result<(), CoinbackError> {
    let config = load_config(config_path)?;
    let params = build_strategy_params(&config, strategy)?;
    let bt_config = build_backtest_config(&config, cash)?;
    let data_port = build_data_port(&config, data)?;

    let series = data_port.load_series(coin)?;
    info!(coin, bars = series.len(), "loaded price series");

    let result = run_strategy(&series, &params, &bt_config)?;
    let metrics = Metrics::compute(&result, CRYPTO_PERIODS_PER_YEAR);
    let label = format!("{} {}", params.policy().name(), params.label());

    print_summary(coin, &label, &result, &metrics);

    let write_report = !no_report && config.get_bool("report", "enabled", true);
    if write_report {
        let output_dir = resolve_output_dir(&config, output);
        let paths = CsvReportAdapter::new().write(
            &result,
            &metrics,
            &format!("{coin} {label}"),
            &output_dir,
        )?;
        for path in paths {
            println!("Report written to: {}", path.display());
        }
    }
    Ok(())
}

fn print_summary(coin: &str, label: &str, result: &BacktestResult, metrics: &Metrics) {
    println!("=== {coin}: {label} ===");
    println!(
        "Final Portfolio Value ({}): ${:.2}",
        result.strategy, result.final_value
    );
    println!(
        "Final Portfolio Value (Buy & Hold): ${:.2}",
        result.baseline_value
    );
    println!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    println!("Buy & Hold:       {:.2}%", metrics.baseline_return * 100.0);
    println!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    println!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    println!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);

    if result.trades.is_empty() {
        println!("No trades.");
    } else {
        println!("Trades:");
        for trade in &result.trades {
            println!("  {trade}");
        }
    }

    if result.outperformed() {
        println!("Strategy outperformed Buy & Hold");
    } else {
        println!("Strategy underperformed Buy & Hold");
    }
}

pub struct SweepAxes {
    pub short_windows: Vec<usize>,
    pub long_windows: Vec<usize>,
    pub atr_multipliers: Vec<f64>,
}

fn run_sweep_command(
    coin: &str,
    config_path: Option<&Path>,
    data: &DataArgs,
    strategy: &StrategyArgs,
    cash: &CashArgs,
    axes: SweepAxes,
    parallel: bool,
) -> Result<(), CoinbackError> {
    let config = load_config(config_path)?;
    let base = build_strategy_params(&config, strategy)?;
    let bt_config = build_backtest_config(&config, cash)?;
    // every combination shares these, so a bad value fails once up front
    bt_config.validate()?;
    let data_port = build_data_port(&config, data)?;
    let series = data_port.load_series(coin)?;

    let grid = ParamGrid {
        base,
        short_windows: axes.short_windows,
        long_windows: axes.long_windows,
        atr_multipliers: axes.atr_multipliers,
    };
    let report = run_sweep(&series, &grid, &bt_config, parallel);

    println!("=== {coin}: {} combinations ===", report.len());
    for (rank, (params, result)) in report.ranked().iter().enumerate() {
        let verdict = if result.outperformed() { "+" } else { "-" };
        println!(
            "{:>3}. {} {:<24} ${:>14.2}  (buy & hold ${:.2}) {}",
            rank + 1,
            params.policy().name(),
            params.label(),
            result.final_value,
            result.baseline_value,
            verdict
        );
    }
    for (params, err) in report.failures() {
        println!("  failed {}: {err}", params.label());
    }
    if let Some((params, result)) = report.best() {
        println!(
            "best: {} {} ({:+.2}% vs buy & hold {:+.2}%)",
            params.policy().name(),
            params.label(),
            result.total_return() * 100.0,
            result.baseline_return() * 100.0
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), CoinbackError> {
    let config = load_config(Some(config_path))?;
    let params = build_strategy_params(&config, &StrategyArgs::default())?;
    let bt_config = build_backtest_config(&config, &CashArgs::default())?;
    bt_config.validate()?;

    println!("Configuration is valid.");
    println!("  strategy:     {} {}", params.policy(), params.label());
    println!("  initial cash: {:.2}", bt_config.initial_cash);
    println!("  commission:   {}", bt_config.commission_rate);
    Ok(())
}

fn run_info(
    coin: Option<&str>,
    config_path: Option<&Path>,
    data: &DataArgs,
) -> Result<(), CoinbackError> {
    let config = load_config(config_path)?;
    let data_port = build_data_port(&config, data)?;

    let Some(coin) = coin else {
        let coins = data_port.list_coins()?;
        if coins.is_empty() {
            println!("No coins found");
        }
        for c in coins {
            println!("{c}");
        }
        return Ok(());
    };

    let series = data_port.load_series(coin)?;
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!(
            "{}: {} bars, {} to {}",
            coin,
            series.len(),
            first.timestamp,
            last.timestamp
        );
    }
    println!(
        "  OHLC columns: {}",
        if series.has_ranges() { "yes" } else { "no" }
    );
    Ok(())
}
