use autotrade::errors::AutomationError;
use autotrade::{CalendarSource, DataSource, FreshnessOracle, Table, UpdateSchedule};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::cell::Cell;
use std::path::Path;

/// Serves one calendar table and counts how often it is fetched
struct FakeCalendar {
    published: Option<DateTime<Utc>>,
    table: Table,
    fetches: Cell<usize>,
}

impl FakeCalendar {
    fn new(published: DateTime<Utc>, dates: &[&str]) -> Self {
        Self {
            published: Some(published),
            table: Table {
                headers: vec!["Date".to_string(), "Name".to_string()],
                rows: dates
                    .iter()
                    .map(|date| vec![date.to_string(), "holiday".to_string()])
                    .collect(),
            },
            fetches: Cell::new(0),
        }
    }

    fn unreachable() -> Self {
        Self {
            published: None,
            table: Table::default(),
            fetches: Cell::new(0),
        }
    }
}

impl DataSource for FakeCalendar {
    fn last_modified(&self, url: &str) -> Result<DateTime<Utc>, AutomationError> {
        self.published
            .ok_or_else(|| AutomationError::Network(format!("{url}: connection refused")))
    }

    fn fetch_table(&self, _url: &str) -> Result<Table, AutomationError> {
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.table.clone())
    }
}

fn calendar(dir: &Path) -> CalendarSource {
    CalendarSource {
        url: "https://example.invalid/holidays.csv".to_string(),
        date_column: "Date".to_string(),
        date_format: "%Y/%m/%d".to_string(),
        cache_path: dir.join("cache").join("market_holidays.txt"),
    }
}

fn schedule() -> UpdateSchedule {
    UpdateSchedule::new(
        NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        chrono_tz::Asia::Tokyo,
    )
}

fn published() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

#[test]
fn test_cache_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeCalendar::new(published(), &["2024/01/01", "not a date", "2024/01/08"]);
    let oracle = FreshnessOracle::new(&source, calendar(dir.path()));

    let holidays = oracle.holidays().unwrap();
    assert_eq!(holidays.len(), 2);
    assert!(holidays.contains(&NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));

    let cached = std::fs::read_to_string(dir.path().join("cache/market_holidays.txt")).unwrap();
    assert_eq!(cached, "2024-01-01\n2024-01-08\n");
}

#[test]
fn test_current_cache_is_not_refetched() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeCalendar::new(published(), &["2024/01/01"]);
    let oracle = FreshnessOracle::new(&source, calendar(dir.path()));

    oracle.holidays().unwrap();
    oracle.holidays().unwrap();
    assert_eq!(source.fetches.get(), 1);
}

#[test]
fn test_unreachable_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeCalendar::unreachable();
    let oracle = FreshnessOracle::new(&source, calendar(dir.path()));

    assert!(matches!(
        oracle.is_stale(&schedule(), &[]),
        Err(AutomationError::Network(_))
    ));
    assert_eq!(source.fetches.get(), 0);
}

#[test]
fn test_missing_target_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeCalendar::new(published(), &[]);
    let oracle = FreshnessOracle::new(&source, calendar(dir.path()));

    let present = dir.path().join("present.csv");
    std::fs::write(&present, "1301,3000\n").unwrap();
    let targets = vec![present.clone(), dir.path().join("missing.csv")];
    assert!(oracle.is_stale(&schedule(), &targets).unwrap());

    // Written just now, so nothing newer can have been published yet
    assert!(!oracle.is_stale(&schedule(), &[present]).unwrap());
}

#[test]
fn test_files_older_than_the_next_publication_are_stale() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeCalendar::new(published(), &[]);
    let oracle = FreshnessOracle::new(&source, calendar(dir.path()));

    let target = dir.path().join("closing_prices_1.csv");
    std::fs::write(&target, "1301,3000\n").unwrap();
    let later = Utc::now() + Duration::days(10);
    assert!(oracle.is_stale_at(later, &schedule(), &[target]).unwrap());
}

#[test]
fn test_live_feed_is_never_stale() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeCalendar::new(published(), &[]);
    let oracle = FreshnessOracle::new(&source, calendar(dir.path()));
    let schedule = schedule().with_volatile_window(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    let missing = vec![dir.path().join("missing.csv")];

    // Thursday, noon in Tokyo
    let trading = Utc.with_ymd_and_hms(2024, 1, 4, 3, 0, 0).unwrap();
    assert!(!oracle.is_stale_at(trading, &schedule, &missing).unwrap());

    // Saturday, same local time
    let weekend = Utc.with_ymd_and_hms(2024, 1, 6, 3, 0, 0).unwrap();
    assert!(oracle.is_stale_at(weekend, &schedule, &missing).unwrap());
}
