//! Domain error types.
//!
//! [`BacktestError`] is raised per run and never aborts the process; a caller
//! sweeping many parameter sets inspects each run's error on its own.
//! [`CoinbackError`] is the application-level error used by ports, adapters
//! and the CLI.

use chrono::NaiveDateTime;

/// Coarse classification of a [`BacktestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Alignment,
    Arithmetic,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("missing required column `{column}` at bar {index} ({timestamp})")]
    MissingColumn {
        column: String,
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("timestamp {timestamp} at bar {index} does not follow {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("invalid bar {index} ({timestamp}): {reason}")]
    InvalidBar {
        index: usize,
        timestamp: NaiveDateTime,
        reason: String,
    },

    #[error("initial cash must be positive, got {value}")]
    InvalidInitialCash { value: f64 },

    #[error("commission rate must be in [0, 1), got {value}")]
    InvalidCommission { value: f64 },

    #[error("required indicator `{indicator}` was not supplied")]
    MissingIndicator { indicator: String },

    #[error("indicator `{indicator}` has {actual} values, series has {expected} bars")]
    Alignment {
        indicator: String,
        expected: usize,
        actual: usize,
    },

    #[error("arithmetic degeneracy at bar {index} ({timestamp}): {reason}")]
    ArithmeticDegeneracy {
        index: usize,
        timestamp: NaiveDateTime,
        reason: String,
    },
}

impl BacktestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BacktestError::Alignment { .. } => ErrorCategory::Alignment,
            BacktestError::ArithmeticDegeneracy { .. } => ErrorCategory::Arithmetic,
            BacktestError::EmptySeries
            | BacktestError::MissingColumn { .. }
            | BacktestError::NonMonotonicTimestamp { .. }
            | BacktestError::InvalidBar { .. }
            | BacktestError::InvalidInitialCash { .. }
            | BacktestError::InvalidCommission { .. }
            | BacktestError::MissingIndicator { .. } => ErrorCategory::Input,
        }
    }
}

/// Top-level error type for coinback.
#[derive(Debug, thiserror::Error)]
pub enum CoinbackError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no price data found for {coin}")]
    NoData { coin: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoinbackError {
    /// Process exit status for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            CoinbackError::Io(_) | CoinbackError::Report { .. } => 1,
            CoinbackError::ConfigParse { .. }
            | CoinbackError::ConfigInvalid { .. } => 2,
            CoinbackError::Data { .. } | CoinbackError::NoData { .. } => 3,
            CoinbackError::Backtest(e) => match e.category() {
                ErrorCategory::Input => 4,
                ErrorCategory::Alignment => 5,
                ErrorCategory::Arithmetic => 6,
            },
        }
    }
}

impl From<&CoinbackError> for std::process::ExitCode {
    fn from(err: &CoinbackError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
