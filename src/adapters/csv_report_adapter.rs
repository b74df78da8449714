//! CSV report adapter.
//!
//! Writes three files per run under the output directory:
//! `<label>_trades.csv`, `<label>_equity.csv` and `<label>_summary.csv`.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CoinbackError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TRADE_HEADER: &[&str] = &["timestamp", "action", "price", "resulting_balance"];
const EQUITY_HEADER: &[&str] = &["timestamp", "close", "equity"];
const SUMMARY_HEADER: &[&str] = &["metric", "value"];

#[derive(Debug, Serialize)]
struct TradeRow {
    timestamp: String,
    action: &'static str,
    price: f64,
    resulting_balance: f64,
}

#[derive(Debug, Serialize)]
struct EquityRow {
    timestamp: String,
    close: f64,
    equity: f64,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    metric: String,
    value: String,
}

impl SummaryRow {
    fn new(metric: &str, value: impl ToString) -> Self {
        SummaryRow {
            metric: metric.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

/// File-name-safe form of a run label: `Moving Average Crossover [10 - 50]`
/// becomes `moving_average_crossover_10_50`.
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

/// The header is written up front so a run with no rows still yields a
/// schema line. It must list the fields of `T` in declaration order.
fn write_rows<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<(), CoinbackError> {
    let report_err = |e: csv::Error| CoinbackError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    };
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(report_err)?;
    wtr.write_record(header).map_err(report_err)?;
    for row in rows {
        wtr.serialize(row).map_err(report_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn summary_rows(result: &BacktestResult, metrics: &Metrics) -> Vec<SummaryRow> {
    let verdict = if result.outperformed() {
        "outperformed"
    } else {
        "underperformed"
    };
    let mut rows = vec![
        SummaryRow::new("strategy", &result.strategy),
        SummaryRow::new("initial_cash", result.initial_cash),
        SummaryRow::new("final_value", result.final_value),
        SummaryRow::new("baseline_value", result.baseline_value),
        SummaryRow::new("verdict", verdict),
        SummaryRow::new("trades", result.trades.len()),
    ];
    rows.extend(
        metrics
            .summary_rows()
            .into_iter()
            .map(|(name, value)| SummaryRow::new(name, value)),
    );
    rows
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        label: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, CoinbackError> {
        fs::create_dir_all(output_dir)?;
        let stem = sanitize_label(label);

        let trades_path = output_dir.join(format!("{stem}_trades.csv"));
        write_rows(
            &trades_path,
            TRADE_HEADER,
            result.trades.iter().map(|t| TradeRow {
                timestamp: t.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                action: t.action.as_str(),
                price: t.price,
                resulting_balance: t.resulting_balance,
            }),
        )?;

        let equity_path = output_dir.join(format!("{stem}_equity.csv"));
        write_rows(
            &equity_path,
            EQUITY_HEADER,
            result.equity_curve.iter().map(|p| EquityRow {
                timestamp: p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                close: p.close,
                equity: p.equity,
            }),
        )?;

        let summary_path = output_dir.join(format!("{stem}_summary.csv"));
        write_rows(&summary_path, SUMMARY_HEADER, summary_rows(result, metrics))?;

        info!(dir = %output_dir.display(), label = %stem, "report written");
        Ok(vec![trades_path, equity_path, summary_path])
    }
}
