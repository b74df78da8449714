//! Core domain types and logic.

pub mod ohlcv;
pub mod price_series;
pub mod position;
pub mod execution;
pub mod indicator;
pub mod indicator_helpers;
pub mod ledger;
pub mod baseline;
pub mod backtest;
pub mod metrics;
pub mod strategy;
pub mod sweep;
pub mod config_validation;
pub mod error;
