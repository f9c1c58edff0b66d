//! Donchian channel bands: highest high / lowest low over a window ending at t.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn new(period: usize, band: DonchianBand) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        let side = match band {
            DonchianBand::Upper => "upper",
            DonchianBand::Lower => "lower",
        };
        Self {
            period,
            band,
            name: format!("donchian_{side}_{period}"),
        }
    }

    pub fn upper(period: usize) -> Self {
        Self::new(period, DonchianBand::Upper)
    }

    pub fn lower(period: usize) -> Self {
        Self::new(period, DonchianBand::Lower)
    }

    fn extreme(&self, window: &[Bar]) -> f64 {
        let mut acc = match self.band {
            DonchianBand::Upper => f64::NEG_INFINITY,
            DonchianBand::Lower => f64::INFINITY,
        };
        for bar in window {
            let v = match self.band {
                DonchianBand::Upper => bar.high,
                DonchianBand::Lower => bar.low,
            };
            if v.is_nan() {
                return f64::NAN;
            }
            acc = match self.band {
                DonchianBand::Upper => acc.max(v),
                DonchianBand::Lower => acc.min(v),
            };
        }
        acc
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        for (i, window) in bars.windows(self.period).enumerate() {
            out[i + self.period - 1] = self.extreme(window);
        }
        out
    }
}
