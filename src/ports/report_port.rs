//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CoinbackError;
use crate::domain::metrics::Metrics;
use std::path::{Path, PathBuf};

/// Port for persisting the artifacts of one run.
pub trait ReportPort {
    /// Write the artifacts for `result` under `output_dir`, naming them after
    /// `label`. Returns the paths written.
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        label: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, CoinbackError>;
}
