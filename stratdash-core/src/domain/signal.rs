//! Position signals — discrete intent per period.

use serde::{Deserialize, Serialize};

/// Position intent for one period, effective from the next period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Short,
    #[default]
    Flat,
    Long,
}

impl Signal {
    pub fn value(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    pub fn is_flat(self) -> bool {
        self == Signal::Flat
    }

    /// Notional turnover of moving from `self` to `next` (0, 1 or 2).
    pub fn turnover_to(self, next: Signal) -> f64 {
        f64::from((next.value() - self.value()).abs())
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.value()
    }
}

impl TryFrom<i8> for Signal {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Signal::Short),
            0 => Ok(Signal::Flat),
            1 => Ok(Signal::Long),
            other => Err(format!("signal must be -1, 0 or 1, got {other}")),
        }
    }
}

/// Signals aligned 1:1 with a price series.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalSeries(Vec<Signal>);

impl SignalSeries {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self(signals)
    }

    /// All-flat series of length `len`.
    pub fn flat(len: usize) -> Self {
        Self(vec![Signal::Flat; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Signal] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<Signal> {
        self.0.get(index).copied()
    }

    /// Number of bars with a non-flat signal.
    pub fn active_bars(&self) -> usize {
        self.0.iter().filter(|s| !s.is_flat()).count()
    }
}

impl From<Vec<Signal>> for SignalSeries {
    fn from(signals: Vec<Signal>) -> Self {
        Self(signals)
    }
}

impl FromIterator<Signal> for SignalSeries {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
