//! Order size from cash, margin and the day's price limit

use crate::errors::AutomationError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Short sales are capped at this many trading units
const SHORT_SELLING_UNIT_CAP: u64 = 50;
const SUSPENDED: &str = "suspended";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Long,
    Short,
}

impl std::str::FromStr for Position {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Position::Long),
            "short" => Ok(Position::Short),
            other => Err(AutomationError::InvalidArgument(format!(
                "position must be 'long' or 'short', got '{other}'"
            ))),
        }
    }
}

/// floor(cash × utilization / margin / price limit / unit) × unit, capped for
/// short positions.
pub fn share_size(
    cash_balance: f64,
    utilization_ratio: f64,
    margin_ratio: f64,
    price_limit: f64,
    trading_unit: u64,
    position: Position,
) -> u64 {
    if margin_ratio <= 0.0 || price_limit <= 0.0 || trading_unit == 0 {
        return 0;
    }
    let units = (cash_balance * utilization_ratio / margin_ratio / price_limit
        / trading_unit as f64)
        .floor()
        .max(0.0) as u64;
    let units = match position {
        Position::Long => units,
        Position::Short => units.min(SHORT_SELLING_UNIT_CAP),
    };
    units * trading_unit
}

#[derive(Debug, Deserialize)]
struct MarginRow {
    symbol: String,
    ratio: String,
}

/// The symbol's margin ratio from `path`, or `fallback` when it is not listed.
///
/// A "suspended" entry is fatal.
pub fn margin_ratio(path: &Path, symbol: &str, fallback: f64) -> Result<f64, AutomationError> {
    if !path.exists() {
        debug!("No margin ratios at {:?}, using {}", path, fallback);
        return Ok(fallback);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AutomationError::Config(format!("{}: {e}", path.display())))?;
    for row in reader.deserialize::<MarginRow>() {
        let row = row.map_err(|e| AutomationError::Parse(format!("{}: {e}", path.display())))?;
        if row.symbol != symbol {
            continue;
        }
        if row.ratio.eq_ignore_ascii_case(SUSPENDED) {
            return Err(AutomationError::MarginSuspended(symbol.to_string()));
        }
        return row.ratio.parse::<f64>().map_err(|e| {
            AutomationError::Parse(format!("margin ratio '{}' of {symbol}: {e}", row.ratio))
        });
    }
    Ok(fallback)
}

/// `closing_prices_<leading character>.csv` inside `directory`.
pub fn closing_prices_path(directory: &Path, symbol: &str) -> Option<PathBuf> {
    symbol
        .chars()
        .next()
        .map(|first| directory.join(format!("closing_prices_{first}.csv")))
}

#[derive(Debug, Deserialize)]
struct ClosingPriceRow {
    symbol: String,
    closing_price: f64,
}

/// The symbol's last closing price, if its file lists it.
pub fn closing_price(directory: &Path, symbol: &str) -> Result<Option<f64>, AutomationError> {
    let Some(path) = closing_prices_path(directory, symbol) else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|e| AutomationError::Config(format!("{}: {e}", path.display())))?;
    let rows = reader
        .deserialize::<ClosingPriceRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AutomationError::Parse(format!("{}: {e}", path.display())))?;

    Ok(rows
        .binary_search_by(|row| row.symbol.as_str().cmp(symbol))
        .ok()
        .map(|i| rows[i].closing_price)
        .filter(|price| *price > 0.0))
}
