//! Exponential Moving Average indicator.
//!
//! k = 2/(span+1), seeded with the first value, then
//! EMA[i] = V[i]*k + EMA[i-1]*(1-k). Defined from the first bar onward.

pub fn calculate_ema(values: &[f64], span: usize) -> Vec<Option<f64>> {
    if span == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema: Option<f64> = None;

    for &v in values {
        let next = match ema {
            None => v,
            Some(prev) => v * k + prev * (1.0 - k),
        };
        ema = Some(next);
        out.push(ema);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_seed_is_first_value() {
        let ema = calculate_ema(&[10.0, 20.0, 30.0], 3);
        assert_relative_eq!(ema[0].unwrap(), 10.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let ema = calculate_ema(&[10.0, 20.0, 30.0, 40.0], 3);
        let k = 2.0 / 4.0;

        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);
        assert_relative_eq!(ema[1].unwrap(), e1);
        assert_relative_eq!(ema[2].unwrap(), e2);
        assert_relative_eq!(ema[3].unwrap(), e3);
    }

    #[test]
    fn ema_equal_prices() {
        let ema = calculate_ema(&[100.0; 5], 9);
        for v in ema {
            assert_relative_eq!(v.unwrap(), 100.0);
        }
    }

    #[test]
    fn ema_span_1_tracks_input() {
        let ema = calculate_ema(&[5.0, 8.0, 2.0], 1);
        assert_eq!(ema, vec![Some(5.0), Some(8.0), Some(2.0)]);
    }

    #[test]
    fn ema_span_0() {
        assert_eq!(calculate_ema(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn ema_empty() {
        assert!(calculate_ema(&[], 9).is_empty());
    }
}
