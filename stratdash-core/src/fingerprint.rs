//! Run fingerprinting — deterministic identity of a backtest computation.
//!
//! A fingerprint is the BLAKE3 hash of the canonical JSON of every input that
//! affects a result: ticker, date range, strategy id, parameters, fee and
//! annualization. `ParameterSet` is backed by a `BTreeMap`, so key order is
//! stable and equal inputs always hash the same.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::params::ParameterSet;

/// Hex-encoded BLAKE3 digest identifying one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

/// Everything that determines a run's result.
#[derive(Debug, Serialize)]
struct FingerprintInput<'a> {
    ticker: &'a str,
    start: NaiveDate,
    end: NaiveDate,
    strategy: &'a str,
    params: &'a ParameterSet,
    fee: f64,
    periods_per_year: f64,
}

impl Fingerprint {
    pub fn compute(
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        strategy_id: &str,
        params: &ParameterSet,
        config: &EngineConfig,
    ) -> Self {
        let input = FingerprintInput {
            ticker,
            start,
            end,
            strategy: strategy_id,
            params,
            fee: config.fee,
            periods_per_year: config.periods_per_year,
        };
        // string keys and plain values only: serialization cannot fail
        let json = serde_json::to_vec(&input).expect("fingerprint input must serialize");
        Self(blake3::hash(&json).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
