//! Domain types: bars, price series, signals, trades.

pub mod bar;
pub mod series;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use series::{series_from_closes, PriceSeries, SeriesError};
pub use signal::{Signal, SignalSeries};
pub use trade::Trade;
