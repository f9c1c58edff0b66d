//! PriceSeries — the immutable price input to a backtest run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Bar;

/// Errors from constructing a price series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar {index} at {timestamp} does not come after {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

/// Ordered bars for one symbol with strictly increasing timestamps.
///
/// Fields are private so the ordering invariant holds for every instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order timestamps.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NonIncreasingTimestamp {
                    index: i + 1,
                    timestamp: pair[1].timestamp,
                    previous: pair[0].timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// Prefix of the first `len` bars. Used to check strategies for lookahead.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }
}

/// Build a daily series from close prices (open = previous close).
///
/// Test and benchmark helper; bars start on 2024-01-02 and advance one calendar day.
pub fn series_from_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect();
    PriceSeries {
        symbol: symbol.to_string(),
        bars,
    }
}
