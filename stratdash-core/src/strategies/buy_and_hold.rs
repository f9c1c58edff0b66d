//! Buy & Hold — long on every bar. Serves as the comparison benchmark.

use crate::domain::{PriceSeries, Signal, SignalSeries};
use crate::error::BacktestError;
use crate::params::{ParamSchema, ParamSpec, ParameterSet};

use super::Strategy;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn id(&self) -> &'static str {
        "buy_and_hold"
    }

    fn name(&self) -> &'static str {
        "Buy & Hold"
    }

    fn description(&self) -> &'static str {
        "### Buy & Hold\n\nLong from the first bar to the last.\n"
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new().with("name", "Buy & Hold")
    }

    fn param_schema(&self) -> ParamSchema {
        ParamSchema::new(vec![ParamSpec::text("name", "Strategy Name")])
    }

    fn min_bars(&self, _params: &ParameterSet) -> usize {
        2
    }

    fn generate(
        &self,
        series: &PriceSeries,
        _params: &ParameterSet,
    ) -> Result<SignalSeries, BacktestError> {
        Ok(SignalSeries::new(vec![Signal::Long; series.len()]))
    }
}
