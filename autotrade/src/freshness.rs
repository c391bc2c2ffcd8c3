//! Deciding whether cached market data needs refetching.
//!
//! Data published at `update_time` on a trading day stays current until the
//! next trading day's publication. The holiday calendar that decides what a
//! trading day is lives in a local cache, refreshed whenever its source
//! reports a newer modification time.

use crate::config::{ConfigStore, GENERAL_SECTION};
use crate::errors::AutomationError;
use crate::fetch::DataSource;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const CACHE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Where the holiday calendar comes from and where it is cached
#[derive(Debug, Clone)]
pub struct CalendarSource {
    pub url: String,
    /// Header text of the column holding the dates
    pub date_column: String,
    /// `chrono` format of the dates in that column
    pub date_format: String,
    pub cache_path: PathBuf,
}

impl CalendarSource {
    pub fn from_store(store: &ConfigStore) -> Result<Self, AutomationError> {
        let s = GENERAL_SECTION;
        Ok(Self {
            url: store.require(s, "calendar_url")?.to_string(),
            date_column: store.require(s, "calendar_date_column")?.to_string(),
            date_format: store
                .get(s, "calendar_date_format")
                .unwrap_or("%Y/%m/%d")
                .to_string(),
            cache_path: store.resolve(
                store
                    .get(s, "calendar_path")
                    .unwrap_or("market_holidays.txt"),
            ),
        })
    }
}

/// When a feed publishes, and optionally when it starts updating live
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateSchedule {
    pub update_time: NaiveTime,
    pub time_zone: Tz,
    /// Opening of the window during which the feed is live
    pub volatile_window: Option<NaiveTime>,
}

impl UpdateSchedule {
    pub fn new(update_time: NaiveTime, time_zone: Tz) -> Self {
        Self {
            update_time,
            time_zone,
            volatile_window: None,
        }
    }

    pub fn with_volatile_window(mut self, opens_at: NaiveTime) -> Self {
        self.volatile_window = Some(opens_at);
        self
    }

    /// `update_time` (`HH:MM:SS`) and `time_zone` (IANA name) from `[General]`.
    pub fn from_store(store: &ConfigStore) -> Result<Self, AutomationError> {
        let s = GENERAL_SECTION;
        let raw_time = store.get(s, "update_time").unwrap_or("20:00:00");
        let update_time = NaiveTime::parse_from_str(raw_time.trim(), "%H:%M:%S")
            .map_err(|e| AutomationError::Config(format!("update_time '{raw_time}': {e}")))?;
        let raw_zone = store.get(s, "time_zone").unwrap_or("Asia/Tokyo");
        let time_zone = raw_zone
            .trim()
            .parse::<Tz>()
            .map_err(|e| AutomationError::Config(format!("time_zone '{raw_zone}': {e}")))?;
        Ok(Self::new(update_time, time_zone))
    }
}

pub fn is_trading_day(date: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
}

fn at_update_time(
    date: NaiveDate,
    schedule: &UpdateSchedule,
) -> Result<DateTime<Tz>, AutomationError> {
    schedule
        .time_zone
        .from_local_datetime(&date.and_time(schedule.update_time))
        .earliest()
        .ok_or_else(|| {
            AutomationError::Internal(format!(
                "{date} {} does not exist in {}",
                schedule.update_time, schedule.time_zone
            ))
        })
}

fn previous_day(date: NaiveDate) -> Result<NaiveDate, AutomationError> {
    date.pred_opt()
        .ok_or_else(|| AutomationError::Internal(format!("no day before {date}")))
}

/// The most recent publication that should exist at `now`.
pub fn latest_update(
    now: DateTime<Utc>,
    schedule: &UpdateSchedule,
    holidays: &HashSet<NaiveDate>,
) -> Result<DateTime<Tz>, AutomationError> {
    let mut date = now.with_timezone(&schedule.time_zone).date_naive();
    if now < at_update_time(date, schedule)? {
        date = previous_day(date)?;
    }
    while !is_trading_day(date, holidays) {
        date = previous_day(date)?;
    }
    at_update_time(date, schedule)
}

/// Oldest modification time among `targets`; a missing target counts as the
/// epoch and ends the scan.
pub fn oldest_modification(targets: &[PathBuf]) -> Result<DateTime<Utc>, AutomationError> {
    let mut oldest: Option<DateTime<Utc>> = None;
    for target in targets {
        if !target.exists() {
            debug!("{:?} is missing", target);
            return Ok(epoch());
        }
        let modified = modification_time(target)?;
        oldest = Some(oldest.map_or(modified, |current| current.min(modified)));
    }
    Ok(oldest.unwrap_or(epoch()))
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH)
}

fn modification_time(path: &Path) -> Result<DateTime<Utc>, AutomationError> {
    Ok(DateTime::<Utc>::from(fs::metadata(path)?.modified()?))
}

pub struct FreshnessOracle<'a> {
    source: &'a dyn DataSource,
    calendar: CalendarSource,
}

impl<'a> FreshnessOracle<'a> {
    pub fn new(source: &'a dyn DataSource, calendar: CalendarSource) -> Self {
        Self { source, calendar }
    }

    /// Brings the holiday cache up to date with its source and returns it.
    ///
    /// Failing to reach the source is fatal.
    #[instrument(skip(self), fields(url = %self.calendar.url))]
    pub fn holidays(&self) -> Result<HashSet<NaiveDate>, AutomationError> {
        let published = self.source.last_modified(&self.calendar.url)?;
        let cache = &self.calendar.cache_path;
        let cached = if cache.exists() {
            Some(modification_time(cache)?)
        } else {
            None
        };

        if cached.map_or(true, |cached| cached < published) {
            self.refetch_calendar()?;
        } else {
            debug!("Holiday cache {:?} is current", cache);
        }
        read_holidays(cache)
    }

    fn refetch_calendar(&self) -> Result<(), AutomationError> {
        let table = self.source.fetch_table(&self.calendar.url)?;
        let mut lines = String::new();
        for cell in table.column(&self.calendar.date_column)? {
            match NaiveDate::parse_from_str(cell.trim(), &self.calendar.date_format) {
                Ok(date) => {
                    lines.push_str(&date.format(CACHE_DATE_FORMAT).to_string());
                    lines.push('\n');
                }
                Err(e) => debug!("Skipping calendar cell '{}': {}", cell, e),
            }
        }

        let cache = &self.calendar.cache_path;
        if let Some(parent) = cache.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(cache, lines)?;
        info!("Refreshed holiday calendar {:?}", cache);
        Ok(())
    }

    /// Whether data in `targets` predates the latest publication.
    pub fn is_stale(
        &self,
        schedule: &UpdateSchedule,
        targets: &[PathBuf],
    ) -> Result<bool, AutomationError> {
        self.is_stale_at(Utc::now(), schedule, targets)
    }

    pub fn is_stale_at(
        &self,
        now: DateTime<Utc>,
        schedule: &UpdateSchedule,
        targets: &[PathBuf],
    ) -> Result<bool, AutomationError> {
        let holidays = self.holidays()?;
        let oldest = oldest_modification(targets)?;
        let latest = latest_update(now, schedule, &holidays)?;
        let stale = oldest < latest;
        debug!(%oldest, %latest, stale, "Freshness check");

        if let Some(opens_at) = schedule.volatile_window {
            let local = now.with_timezone(&schedule.time_zone);
            let live = is_trading_day(local.date_naive(), &holidays)
                && (opens_at..=schedule.update_time).contains(&local.time());
            if live {
                debug!("Feed is live, not refetching");
                return Ok(false);
            }
        }
        Ok(stale)
    }
}

/// Dates in the cache, one `YYYY-MM-DD` per line.
pub fn read_holidays(path: &Path) -> Result<HashSet<NaiveDate>, AutomationError> {
    fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            NaiveDate::parse_from_str(line, CACHE_DATE_FORMAT)
                .map_err(|e| AutomationError::Parse(format!("holiday '{line}': {e}")))
        })
        .collect()
}
