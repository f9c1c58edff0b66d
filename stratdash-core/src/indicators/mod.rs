//! Price indicators used by the built-in strategies.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each
//! output has the same length as the input and is `f64::NAN` during warmup.

pub mod donchian;
pub mod ema;
pub mod sma;

pub use donchian::{Donchian, DonchianBand};
pub use ema::{ema_of_series, Ema};
pub use sma::{sma_of_series, Sma};

use crate::domain::Bar;

/// A causal transform of bar history.
///
/// The value at bar `t` reads bars `0..=t` only, so computing on a prefix of
/// the history reproduces the prefix of the full output.
pub trait Indicator: Send + Sync {
    /// Short identifier such as `sma_20`.
    fn name(&self) -> &str;

    /// Leading bars that come out as `NAN`.
    fn lookback(&self) -> usize;

    /// One value per bar.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    crate::domain::series_from_closes("TEST", closes)
        .bars()
        .to_vec()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    let diff = (actual - expected).abs();
    assert!(diff < epsilon, "expected {expected}, got {actual} (diff {diff})");
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_no_lookahead(indicator: &dyn Indicator, closes: &[f64]) {
        let bars = make_bars(closes);
        let full = indicator.compute(&bars);
        for cut in 1..bars.len() {
            let partial = indicator.compute(&bars[..cut]);
            for (i, (&a, &b)) in partial.iter().zip(&full).enumerate() {
                assert!(
                    (a.is_nan() && b.is_nan()) || a == b,
                    "{} at bar {i} changed when bars after {cut} were added",
                    indicator.name()
                );
            }
        }
    }

    #[test]
    fn indicators_do_not_look_ahead() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        assert_no_lookahead(&Sma::new(5), &closes);
        assert_no_lookahead(&Ema::new(7), &closes);
        assert_no_lookahead(&Donchian::upper(10), &closes);
        assert_no_lookahead(&Donchian::lower(10), &closes);
    }
}
