use autotrade::config::GENERAL_SECTION;
use autotrade::errors::AutomationError;
use autotrade::market_data::{closing_price_files, update_closing_prices};
use autotrade::sizing::closing_price;
use autotrade::{ConfigStore, DataSource, Table};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::path::Path;

const CALENDAR_URL: &str = "https://example.invalid/holidays.csv";
const PRICES_URL: &str = "https://example.invalid/prices.csv";

/// Serves a holiday calendar and a price table, recording each fetch
#[derive(Default)]
struct FakeMarket {
    fetched: RefCell<Vec<String>>,
}

impl DataSource for FakeMarket {
    fn last_modified(&self, _url: &str) -> Result<DateTime<Utc>, AutomationError> {
        Ok(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn fetch_table(&self, url: &str) -> Result<Table, AutomationError> {
        self.fetched.borrow_mut().push(url.to_string());
        match url {
            CALENDAR_URL => Table::from_csv("Date,Name\n2024/01/01,New Year\n"),
            PRICES_URL => Table::from_csv(
                "Date,Code,Name,Close\n\
                 2024/01/05,7203,Toyota,\"2,650\"\n\
                 2024/01/05,1332,Nissui,850.5\n\
                 2024/01/05,1301,Kyokuyo,3600\n\
                 2024/01/05,1305,ETF,-\n",
            ),
            other => Err(AutomationError::Network(format!("unexpected {other}"))),
        }
    }
}

fn store(dir: &Path) -> ConfigStore {
    let mut store = ConfigStore::empty(dir.join("config.ini"));
    let s = GENERAL_SECTION;
    store.set(s, "calendar_url", CALENDAR_URL);
    store.set(s, "calendar_date_column", "Date");
    store.set(s, "closing_prices_url", PRICES_URL);
    store.set(s, "closing_prices_directory", "prices");
    store
}

#[test]
fn test_prices_are_split_by_leading_digit() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let source = FakeMarket::default();

    assert!(update_closing_prices(&store, &source).unwrap());

    let prices = dir.path().join("prices");
    assert!(closing_price_files(&prices).iter().all(|file| file.exists()));
    let ones = std::fs::read_to_string(prices.join("closing_prices_1.csv")).unwrap();
    let symbols: Vec<&str> = ones
        .lines()
        .filter_map(|line| line.split(',').next())
        .collect();
    assert_eq!(symbols, vec!["1301", "1332"]);
    assert_eq!(closing_price(&prices, "1332").unwrap(), Some(850.5));
    assert_eq!(closing_price(&prices, "7203").unwrap(), Some(2650.0));
    assert_eq!(closing_price(&prices, "1305").unwrap(), None);
    assert_eq!(
        std::fs::read_to_string(prices.join("closing_prices_5.csv")).unwrap(),
        ""
    );
    assert!(dir.path().join("market_holidays.txt").exists());
}

#[test]
fn test_current_prices_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let source = FakeMarket::default();

    assert!(update_closing_prices(&store, &source).unwrap());
    assert!(!update_closing_prices(&store, &source).unwrap());
    assert_eq!(
        *source.fetched.borrow(),
        vec![CALENDAR_URL.to_string(), PRICES_URL.to_string()]
    );
}
