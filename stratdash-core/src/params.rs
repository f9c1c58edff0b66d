//! Parameter sets and the schemas strategies declare for them.
//!
//! A `ParameterSet` is a name → value map. `BTreeMap` keeps key order
//! deterministic so a set serializes (and fingerprints) identically every time.
//! A `ParamSchema` lists each parameter's type and bounds; validation happens
//! before any signal is generated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BacktestError;

/// Relative tolerance when checking that a number sits on its step grid.
const STEP_TOLERANCE: f64 = 1e-6;

/// Label used when a parameter set carries no `name`.
pub const UNNAMED_LABEL: &str = "Unnamed";

/// A single parameter value. Choices are text values constrained by the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "text",
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Named parameter values for one strategy run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_number)
    }

    /// Integer parameter. Only meaningful after schema validation has
    /// confirmed the value is integral and non-negative.
    pub fn usize(&self, name: &str) -> Option<usize> {
        self.number(name).map(|v| v as usize)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_text)
    }

    /// Display label: the `name` parameter, or "Unnamed".
    pub fn label(&self) -> &str {
        match self.text("name") {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNNAMED_LABEL,
        }
    }

    /// Copy of `self` with every key in `overrides` replaced.
    pub fn merged(&self, overrides: &ParameterSet) -> ParameterSet {
        let mut out = self.clone();
        for (k, v) in &overrides.0 {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Declared type and bounds of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Number { min: f64, max: f64, step: f64 },
    Integer { min: i64, max: i64, step: i64 },
    Text,
    Choice { options: Vec<String> },
}

/// One entry of a strategy's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub label: String,
    pub help: String,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn number(name: &str, label: &str, min: f64, max: f64, step: f64) -> Self {
        Self::new(name, label, ParamKind::Number { min, max, step })
    }

    pub fn integer(name: &str, label: &str, min: i64, max: i64) -> Self {
        Self::new(name, label, ParamKind::Integer { min, max, step: 1 })
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, ParamKind::Text)
    }

    pub fn choice(name: &str, label: &str, options: &[&str]) -> Self {
        Self::new(
            name,
            label,
            ParamKind::Choice {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        )
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    fn new(name: &str, label: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            help: String::new(),
            kind,
        }
    }

    /// Check one value against this spec.
    pub fn check(&self, value: &ParamValue) -> Result<(), BacktestError> {
        let fail = |reason: String| Err(BacktestError::invalid_param(&self.name, reason));

        match (&self.kind, value) {
            (ParamKind::Number { min, max, step }, ParamValue::Number(v)) => {
                if !v.is_finite() {
                    return fail(format!("must be finite, got {v}"));
                }
                if v < min || v > max {
                    return fail(format!("must be within [{min}, {max}], got {v}"));
                }
                if *step > 0.0 && !on_step_grid(*v, *min, *step) {
                    return fail(format!("must be {min} plus a multiple of {step}, got {v}"));
                }
                Ok(())
            }
            (ParamKind::Integer { min, max, step }, ParamValue::Number(v)) => {
                if !v.is_finite() || v.fract() != 0.0 {
                    return fail(format!("must be an integer, got {v}"));
                }
                let (lo, hi) = (*min as f64, *max as f64);
                if *v < lo || *v > hi {
                    return fail(format!("must be within [{min}, {max}], got {v}"));
                }
                if *step > 1 && (*v as i64 - min) % step != 0 {
                    return fail(format!("must be {min} plus a multiple of {step}, got {v}"));
                }
                Ok(())
            }
            (ParamKind::Text, ParamValue::Text(_)) => Ok(()),
            (ParamKind::Choice { options }, ParamValue::Text(s)) => {
                if options.iter().any(|o| o == s) {
                    Ok(())
                } else {
                    fail(format!("must be one of {options:?}, got '{s}'"))
                }
            }
            (kind, other) => fail(format!(
                "expected {}, got {}",
                kind_name(kind),
                other.type_name()
            )),
        }
    }
}

fn kind_name(kind: &ParamKind) -> &'static str {
    match kind {
        ParamKind::Number { .. } => "number",
        ParamKind::Integer { .. } => "integer",
        ParamKind::Text => "text",
        ParamKind::Choice { .. } => "choice",
    }
}

fn on_step_grid(value: f64, min: f64, step: f64) -> bool {
    let k = (value - min) / step;
    (k - k.round()).abs() <= STEP_TOLERANCE * k.abs().max(1.0)
}

/// The full parameter schema of a strategy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamSchema {
    specs: Vec<ParamSpec>,
}

impl ParamSchema {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Every declared parameter must be present and valid; undeclared keys are rejected.
    pub fn validate(&self, params: &ParameterSet) -> Result<(), BacktestError> {
        for (name, _) in params.iter() {
            if self.spec(name).is_none() {
                return Err(BacktestError::invalid_param(name, "unknown parameter"));
            }
        }
        for spec in &self.specs {
            match params.get(&spec.name) {
                Some(value) => spec.check(value)?,
                None => return Err(BacktestError::invalid_param(&spec.name, "missing value")),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::text("name", "Strategy Name"),
            ParamSpec::number("sr_buy", "SR Buy Level", 0.0, 1.0, 0.05),
            ParamSpec::integer("period", "Period", 2, 200),
            ParamSpec::choice("ma_type", "MA Type", &["sma", "ema"]),
        ])
    }

    fn valid() -> ParameterSet {
        ParameterSet::new()
            .with("name", "Standard")
            .with("sr_buy", 0.3)
            .with("period", 20_i64)
            .with("ma_type", "ema")
    }

    #[test]
    fn valid_set_passes() {
        assert!(schema().validate(&valid()).is_ok());
    }

    #[test]
    fn out_of_range_fails() {
        let p = valid().with("sr_buy", 1.5);
        let err = schema().validate(&p).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidParameters { ref param, .. } if param == "sr_buy"));
    }

    #[test]
    fn off_step_fails() {
        let p = valid().with("sr_buy", 0.33);
        assert!(schema().validate(&p).is_err());
        // 0.35 is on the grid despite float error in 0.35 / 0.05
        let p = valid().with("sr_buy", 0.35);
        assert!(schema().validate(&p).is_ok());
    }

    #[test]
    fn wrong_type_fails() {
        let p = valid().with("sr_buy", "high");
        let err = schema().validate(&p).unwrap_err();
        assert!(err.to_string().contains("expected number"));
    }

    #[test]
    fn fractional_integer_fails() {
        let p = valid().with("period", 20.5);
        assert!(schema().validate(&p).is_err());
    }

    #[test]
    fn unknown_choice_fails() {
        let p = valid().with("ma_type", "wma");
        assert!(schema().validate(&p).is_err());
    }

    #[test]
    fn unknown_and_missing_keys_fail() {
        let p = valid().with("bogus", 1.0);
        assert!(schema().validate(&p).is_err());

        let mut missing = ParameterSet::new();
        missing.insert("name", "x");
        let err = schema().validate(&missing).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn nan_fails() {
        let p = valid().with("sr_buy", f64::NAN);
        assert!(schema().validate(&p).is_err());
    }

    #[test]
    fn merged_overrides_keys() {
        let defaults = valid();
        let overrides = ParameterSet::new().with("sr_buy", 0.4);
        let merged = defaults.merged(&overrides);
        assert_eq!(merged.number("sr_buy"), Some(0.4));
        assert_eq!(merged.text("name"), Some("Standard"));
        assert_eq!(merged.len(), defaults.len());
    }

    #[test]
    fn label_falls_back_to_unnamed() {
        assert_eq!(valid().label(), "Standard");
        assert_eq!(ParameterSet::new().label(), UNNAMED_LABEL);
        assert_eq!(ParameterSet::new().with("name", "  ").label(), UNNAMED_LABEL);
    }

    #[test]
    fn untagged_values_deserialize() {
        let p: ParameterSet =
            serde_json::from_str(r#"{"name":"Std","sr_buy":0.3,"period":20}"#).unwrap();
        assert_eq!(p.text("name"), Some("Std"));
        assert_eq!(p.number("period"), Some(20.0));
    }

    #[test]
    fn serialization_is_key_ordered() {
        let a = ParameterSet::new().with("b", 1.0).with("a", 2.0);
        let b = ParameterSet::new().with("a", 2.0).with("b", 1.0);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
