//! StratDash Runner — comparison orchestration on top of `stratdash-core`.
//!
//! This crate provides:
//! - TOML comparison config and date-range validation
//! - Price loading from CSV with a deterministic synthetic fallback
//! - An in-memory result cache keyed by run fingerprint
//! - A parallel comparison runner with per-run error isolation
//! - Monthly return and summary analytics
//! - JSON, CSV and Markdown export

pub mod cache;
pub mod comparison;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod report;

pub use cache::{CachePolicy, CacheStats, ResultCache};
pub use comparison::{ComparisonEntry, ComparisonReport, ComparisonRunner, RunOutcome};
pub use config::{validate_date_range, ComparisonConfig, ConfigError, RunSpec};
pub use data_loader::{load_prices, DataSource, LoadError, LoadedPrices};
pub use export::{ReportDocument, SCHEMA_VERSION};
pub use report::{monthly_returns, summary_rows, MonthlyReturn, SummaryRow};
