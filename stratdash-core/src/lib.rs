//! StratDash Core — price series, strategies, and the signal-to-metrics engine.
//!
//! This crate contains the backtesting engine:
//! - Domain types (bars, price series, signals, trades)
//! - Typed parameter sets validated against per-strategy schemas
//! - Indicators and the built-in strategies behind the `Strategy` trait
//! - The strategy registry
//! - Return engine, trade extractor, metrics calculator, result container
//! - Run fingerprints for caching
//!
//! No I/O happens here. Loading prices, caching, and reporting live in
//! `stratdash-runner`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod params;
pub mod registry;
pub mod strategies;

pub use domain::{Bar, PriceSeries, SeriesError, Signal, SignalSeries, Trade};
pub use engine::{evaluate_signals, run_backtest, BacktestResult, EngineConfig, Metrics};
pub use error::BacktestError;
pub use fingerprint::Fingerprint;
pub use params::{ParamKind, ParamSchema, ParamSpec, ParamValue, ParameterSet};
pub use registry::{RegistryError, StrategyRegistry};
pub use strategies::Strategy;
