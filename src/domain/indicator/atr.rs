//! Average True Range variants.
//!
//! Close-only feeds have no candle range, so their true range degenerates to
//! |close[i] - close[i-1]|. Candle feeds use a plain rolling mean of
//! (high - low).

use super::sma::calculate_sma;

/// Rolling mean of |close[i] - close[i-1]| over `period` bars.
///
/// The true range is undefined at bar 0, so the first defined value is at
/// index `period`.
pub fn calculate_close_atr(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if closes.len() < 2 || period == 0 {
        return vec![None; closes.len()];
    }

    let true_ranges: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let mut out = Vec::with_capacity(closes.len());
    out.push(None);
    out.extend(calculate_sma(&true_ranges, period));
    out
}

/// Rolling mean of per-bar (high - low) over `period` bars. Bars without a
/// range poison every window that contains them.
pub fn calculate_range_atr(ranges: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = ranges.len();
    if period == 0 {
        return vec![None; n];
    }

    (0..n)
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &ranges[i + 1 - period..=i];
            let sum = window.iter().copied().sum::<Option<f64>>()?;
            Some(sum / period as f64)
        })
        .collect()
}
