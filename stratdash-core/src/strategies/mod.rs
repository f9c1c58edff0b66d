//! Strategy contract and the built-in signal generators.
//!
//! A strategy maps a price series and a validated parameter set to one
//! position signal per bar. Strategies are portfolio-agnostic and stateless;
//! the signal at bar t may only use bars `0..=t`.

pub mod buy_and_hold;
pub mod donchian;
pub mod ma_crossover;
pub mod support_resistance;

pub use buy_and_hold::BuyAndHold;
pub use donchian::DonchianBreakout;
pub use ma_crossover::{MaCrossover, MaMode, MaType};
pub use support_resistance::SupportResistance;

use crate::domain::{PriceSeries, SignalSeries};
use crate::error::BacktestError;
use crate::params::{ParamSchema, ParameterSet};

/// Trait for signal generators.
///
/// Implementors describe themselves (id, display name, markdown description,
/// defaults, schema) and turn a series into signals. Parameter validation and
/// the minimum-length check run in [`Strategy::prepare`] before `generate`.
pub trait Strategy: Send + Sync {
    /// Stable identifier used in configs and fingerprints (e.g. "ma_crossover").
    fn id(&self) -> &'static str;

    /// Display name.
    fn name(&self) -> &'static str;

    /// Markdown explanation of the rules and parameters.
    fn description(&self) -> &'static str;

    fn default_params(&self) -> ParameterSet;

    fn param_schema(&self) -> ParamSchema;

    /// Schema check plus any cross-parameter rules. Overriding
    /// implementations should call [`ParamSchema::validate`] first.
    fn validate(&self, params: &ParameterSet) -> Result<(), BacktestError> {
        self.param_schema().validate(params)
    }

    /// Fewest bars the given (validated) parameters can produce signals on.
    fn min_bars(&self, params: &ParameterSet) -> usize;

    /// Produce one signal per bar of `series`.
    ///
    /// Bars inside the warmup window are flat. Callers go through
    /// [`Strategy::prepare`] first.
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<SignalSeries, BacktestError>;

    /// Fill unspecified keys from the defaults, validate, and check that
    /// `series` is long enough. Returns the resolved parameter set.
    fn prepare(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<ParameterSet, BacktestError> {
        let resolved = self.default_params().merged(params);
        self.validate(&resolved)?;
        let required = self.min_bars(&resolved);
        if series.len() < required {
            return Err(BacktestError::InsufficientData {
                required,
                available: series.len(),
            });
        }
        Ok(resolved)
    }
}

/// Integer parameter that the schema has already checked.
pub(crate) fn period_param(params: &ParameterSet, name: &str) -> Result<usize, BacktestError> {
    params
        .usize(name)
        .filter(|&p| p >= 1)
        .ok_or_else(|| BacktestError::invalid_param(name, "expected a positive integer"))
}

pub(crate) fn number_param(params: &ParameterSet, name: &str) -> Result<f64, BacktestError> {
    params
        .number(name)
        .ok_or_else(|| BacktestError::invalid_param(name, "expected a number"))
}

pub(crate) fn text_param<'a>(
    params: &'a ParameterSet,
    name: &str,
) -> Result<&'a str, BacktestError> {
    params
        .text(name)
        .ok_or_else(|| BacktestError::invalid_param(name, "expected text"))
}
