//! Price loading for the comparison runner.
//!
//! Prices come from one of two places:
//! 1. A CSV file named in the config (or on the command line)
//! 2. Otherwise, a deterministic synthetic random walk (tagged, logged)
//!
//! Either way the result is a validated `PriceSeries` restricted to the
//! configured date range, plus a BLAKE3 dataset hash for provenance.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use stratdash_core::{Bar, PriceSeries, SeriesError};

use crate::config::DataSection;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open price file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("price file has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("row {row}: invalid date '{value}'")]
    BadDate { row: usize, value: String },

    #[error("row {row}: invalid {column} '{value}'")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: inconsistent prices on {timestamp} (need 0 < low <= open, close <= high)")]
    InsaneBar { row: usize, timestamp: NaiveDateTime },

    #[error("duplicate timestamp {0}")]
    DuplicateTimestamp(NaiveDateTime),

    #[error("no price rows between {start} and {end}")]
    NoRows { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Where a series came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic,
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic)
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Csv(path) => write!(f, "csv:{}", path.display()),
            DataSource::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// A loaded series with provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub series: PriceSeries,
    pub source: DataSource,
    /// BLAKE3 over every bar, hex.
    pub dataset_hash: String,
}

/// Load prices for a `[data]` section, from CSV when one is given.
pub fn load_prices(data: &DataSection) -> Result<LoadedPrices, LoadError> {
    let (series, source) = match &data.csv {
        Some(path) => {
            let series = load_csv(path, &data.ticker, data.start, data.end)?;
            (series, DataSource::Csv(path.clone()))
        }
        None => {
            warn!(
                ticker = %data.ticker,
                "no price file configured, using synthetic prices"
            );
            let series = synthetic_series(&data.ticker, data.start, data.end)?;
            (series, DataSource::Synthetic)
        }
    };
    if series.is_empty() {
        return Err(LoadError::NoRows {
            start: data.start,
            end: data.end,
        });
    }
    let dataset_hash = compute_dataset_hash(&series);
    debug!(
        ticker = %data.ticker,
        bars = series.len(),
        source = %source,
        "prices loaded"
    );
    Ok(LoadedPrices {
        series,
        source,
        dataset_hash,
    })
}

/// Read a price CSV and keep the rows dated within `[start, end]`.
pub fn load_csv(
    path: &Path,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file, symbol, start, end)
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();
        let find = |names: &[&str]| names.iter().find_map(|n| index.get(*n).copied());

        Ok(Self {
            date: find(&["date", "datetime", "timestamp"]).ok_or(LoadError::MissingColumn("date"))?,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            close: find(&["close", "adj close", "adj_close"])
                .ok_or(LoadError::MissingColumn("close"))?,
            volume: find(&["volume"]),
        })
    }
}

/// Parse CSV price rows from any reader.
///
/// Rows with an empty or `null` close are skipped. Missing open/high/low
/// columns fall back to the close.
pub fn parse_csv<R: Read>(
    reader: R,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::resolve(rdr.headers()?)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // header is line 1
        let row = i + 2;

        let raw_date = record.get(columns.date).unwrap_or_default();
        let timestamp = parse_timestamp(raw_date).ok_or_else(|| LoadError::BadDate {
            row,
            value: raw_date.to_string(),
        })?;
        let day = timestamp.date();
        if day < start || day > end {
            continue;
        }

        let Some(close) = parse_field(&record, Some(columns.close), row, "close")? else {
            skipped += 1;
            continue;
        };
        let open = parse_field(&record, columns.open, row, "open")?.unwrap_or(close);
        let high = parse_field(&record, columns.high, row, "high")?.unwrap_or(close);
        let low = parse_field(&record, columns.low, row, "low")?.unwrap_or(close);
        let volume = parse_field(&record, columns.volume, row, "volume")?.unwrap_or(0.0);

        let bar = Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: volume.max(0.0).round() as u64,
        };
        if !bar.is_sane() {
            return Err(LoadError::InsaneBar { row, timestamp });
        }
        bars.push(bar);
    }
    if skipped > 0 {
        warn!(symbol, skipped, "skipped price rows without a close");
    }

    bars.sort_by_key(|b| b.timestamp);
    if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(LoadError::DuplicateTimestamp(pair[1].timestamp));
    }
    Ok(PriceSeries::new(symbol, bars)?)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `Ok(None)` for an absent column or a null cell.
fn parse_field(
    record: &csv::StringRecord,
    column: Option<usize>,
    row: usize,
    name: &'static str,
) -> Result<Option<f64>, LoadError> {
    let Some(raw) = column.and_then(|c| record.get(c)) else {
        return Ok(None);
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| LoadError::BadNumber {
            row,
            column: name,
            value: raw.to_string(),
        })
}

/// Deterministic synthetic daily prices for `symbol`, weekdays only.
///
/// The walk is seeded from the symbol, so the same symbol always yields the
/// same prices for a given range.
pub fn synthetic_series(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    for day in start.iter_days().take_while(|d| *d <= end) {
        if matches!(day.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            continue;
        }
        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            timestamp: day.and_time(chrono::NaiveTime::MIN),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    Ok(PriceSeries::new(symbol, bars)?)
}

/// BLAKE3 over the symbol and every bar's fields.
pub fn compute_dataset_hash(series: &PriceSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.symbol().as_bytes());
    for bar in series.bars() {
        hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
