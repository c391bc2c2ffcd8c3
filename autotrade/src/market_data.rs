//! Refreshing the per-digit closing price files

use crate::config::{ConfigStore, Settings, GENERAL_SECTION};
use crate::errors::AutomationError;
use crate::fetch::DataSource;
use crate::freshness::{CalendarSource, FreshnessOracle, UpdateSchedule};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Leading characters that always get a file, so a quiet digit does not read as stale
const LEADING_DIGITS: [char; 9] = ['1', '2', '3', '4', '5', '6', '7', '8', '9'];

pub fn closing_price_files(directory: &Path) -> Vec<PathBuf> {
    LEADING_DIGITS
        .iter()
        .map(|digit| directory.join(format!("closing_prices_{digit}.csv")))
        .collect()
}

/// Refetches closing prices when the files predate the latest publication.
/// Returns whether anything was written.
pub fn update_closing_prices(
    store: &ConfigStore,
    source: &dyn DataSource,
) -> Result<bool, AutomationError> {
    update_closing_prices_at(Utc::now(), store, source)
}

#[instrument(skip(store, source))]
pub fn update_closing_prices_at(
    now: DateTime<Utc>,
    store: &ConfigStore,
    source: &dyn DataSource,
) -> Result<bool, AutomationError> {
    let settings = Settings::from_store(store)?;
    let directory = &settings.closing_prices_directory;
    let oracle = FreshnessOracle::new(source, CalendarSource::from_store(store)?);
    let schedule = UpdateSchedule::from_store(store)?;

    if !oracle.is_stale_at(now, &schedule, &closing_price_files(directory))? {
        info!("Closing prices in {:?} are current", directory);
        return Ok(false);
    }

    let url = store.require(GENERAL_SECTION, "closing_prices_url")?;
    let table = source.fetch_table(url)?;
    let symbols = table.column(store.get(GENERAL_SECTION, "symbol_column").unwrap_or("Code"))?;
    let prices = table.column(
        store
            .get(GENERAL_SECTION, "closing_price_column")
            .unwrap_or("Close"),
    )?;

    let mut groups: BTreeMap<char, Vec<(String, f64)>> =
        LEADING_DIGITS.iter().map(|digit| (*digit, Vec::new())).collect();
    for (symbol, price) in symbols.into_iter().zip(prices) {
        let symbol = symbol.trim();
        let Some(leading) = symbol.chars().next() else {
            continue;
        };
        match price.trim().replace(',', "").parse::<f64>() {
            Ok(price) => groups
                .entry(leading)
                .or_default()
                .push((symbol.to_string(), price)),
            Err(_) => debug!("Skipping {} with price '{}'", symbol, price),
        }
    }

    fs::create_dir_all(directory)?;
    let mut written = 0;
    for (leading, mut rows) in groups {
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        let path = directory.join(format!("closing_prices_{leading}.csv"));
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| AutomationError::Io(e.into()))?;
        for (symbol, price) in &rows {
            writer
                .serialize((symbol, price))
                .map_err(|e| AutomationError::Io(e.into()))?;
        }
        writer.flush()?;
        written += rows.len();
    }
    info!("Wrote {} closing prices to {:?}", written, directory);
    Ok(true)
}
