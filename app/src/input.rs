// In app/src/input.rs
//
// Request-layer loading and validation. Everything here runs before the core
// crates are called, so their preconditions can be assumed downstream.

use anyhow::{Context, Result, bail};
use backtester::ParamGrid;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use core_types::Bar;
use options::OptionLeg;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const MAX_LEGS: usize = 8;

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    #[serde(default)]
    volume: Decimal,
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("Unrecognized timestamp '{raw}'"))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

/// Reads OHLCV bars from CSV with a `timestamp,open,high,low,close,volume` header.
/// Rows are sorted chronologically.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();
    for (row, record) in reader.deserialize::<CsvBar>().enumerate() {
        let record = record.with_context(|| format!("Malformed bar on data row {}", row + 1))?;
        bars.push(Bar {
            timestamp: parse_timestamp(&record.timestamp)?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).with_context(|| format!("Failed to open bar file {}", path.display()))?;
    let bars = read_bars(file)?;
    tracing::info!(path = %path.display(), bars = bars.len(), "Loaded bars.");
    Ok(bars)
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Checks a leg set before it reaches the analyzer.
pub fn validate_legs(legs: &[OptionLeg]) -> Result<()> {
    if legs.is_empty() || legs.len() > MAX_LEGS {
        bail!("A strategy needs between 1 and {MAX_LEGS} legs, got {}", legs.len());
    }
    for (i, leg) in legs.iter().enumerate() {
        if !(leg.strike.is_finite() && leg.strike > 0.0) {
            bail!("Leg {} has a non-positive strike ({})", i + 1, leg.strike);
        }
        if leg.qty == 0 {
            bail!("Leg {} has zero quantity", i + 1);
        }
        if !(leg.premium.is_finite() && leg.premium >= 0.0) {
            bail!("Leg {} has a negative premium ({})", i + 1, leg.premium);
        }
    }
    Ok(())
}

pub fn load_legs(path: &Path) -> Result<Vec<OptionLeg>> {
    let legs: Vec<OptionLeg> = load_json(path)?;
    validate_legs(&legs)?;
    Ok(legs)
}

/// One strike of an option chain snapshot.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRow {
    pub strike: f64,
    #[serde(default)]
    pub call_oi: u64,
    #[serde(default)]
    pub put_oi: u64,
}

/// Strikes in chain order plus call and put open interest keyed by strike.
pub struct OpenInterest {
    pub strikes: Vec<Decimal>,
    pub calls: HashMap<Decimal, u64>,
    pub puts: HashMap<Decimal, u64>,
}

pub fn open_interest(rows: &[ChainRow]) -> Result<OpenInterest> {
    let mut chain = OpenInterest {
        strikes: Vec::with_capacity(rows.len()),
        calls: HashMap::new(),
        puts: HashMap::new(),
    };
    for row in rows {
        let strike = Decimal::from_f64(row.strike)
            .filter(|s| *s > Decimal::ZERO)
            .with_context(|| format!("Invalid strike {}", row.strike))?
            .normalize();
        chain.strikes.push(strike);
        *chain.calls.entry(strike).or_default() += row.call_oi;
        *chain.puts.entry(strike).or_default() += row.put_oi;
    }
    Ok(chain)
}

/// Parses `key=v1,v2,...` grid arguments.
pub fn parse_grid(args: &[String]) -> Result<ParamGrid> {
    let mut grid = ParamGrid::new();
    for arg in args {
        let (key, values) = arg
            .split_once('=')
            .with_context(|| format!("Grid entry '{arg}' is not of the form key=v1,v2"))?;
        let values = values
            .split(',')
            .map(|v| v.trim().parse::<f64>().with_context(|| format!("'{v}' in '{arg}' is not a number")))
            .collect::<Result<Vec<f64>>>()?;
        grid.insert(key.trim().to_string(), values);
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use options::{LegAction, OptionType};
    use rust_decimal_macros::dec;

    #[test]
    fn bars_parse_and_sort() {
        let csv = "timestamp,open,high,low,close,volume\n\
                   2024-01-03,101,103,100,102.5,900\n\
                   2024-01-02T00:00:00Z,100,102,99,101,1000\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert_eq!(bars[0].close, dec!(101));
        assert_eq!(bars[1].close, dec!(102.5));
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let csv = "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n";
        assert!(read_bars(csv.as_bytes()).is_err());
    }

    #[test]
    fn leg_sets_are_bounded() {
        let leg = OptionLeg::new(OptionType::Call, LegAction::Buy, 100.0, 1, 2.0);
        assert!(validate_legs(&[]).is_err());
        assert!(validate_legs(&vec![leg.clone(); MAX_LEGS]).is_ok());
        assert!(validate_legs(&vec![leg.clone(); MAX_LEGS + 1]).is_err());

        let mut bad = leg.clone();
        bad.strike = 0.0;
        assert!(validate_legs(&[bad]).is_err());
    }

    #[test]
    fn grid_arguments() {
        let grid = parse_grid(&["period=10,20".into(), "threshold = 1.5".into()]).unwrap();
        assert_eq!(grid["period"], vec![10.0, 20.0]);
        assert_eq!(grid["threshold"], vec![1.5]);
        assert!(parse_grid(&["period".into()]).is_err());
        assert!(parse_grid(&["period=ten".into()]).is_err());
    }

    #[test]
    fn chain_rows_become_open_interest_maps() {
        let rows = [
            ChainRow { strike: 100.0, call_oi: 5, put_oi: 7 },
            ChainRow { strike: 102.5, call_oi: 3, put_oi: 0 },
        ];
        let chain = open_interest(&rows).unwrap();
        assert_eq!(chain.strikes, vec![dec!(100), dec!(102.5)]);
        assert_eq!(chain.calls[&dec!(102.5)], 3);
        assert_eq!(chain.puts[&dec!(100)], 7);
    }
}
