//! Remote tables the freshness oracle and price refresh consume

use crate::errors::AutomationError;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::LAST_MODIFIED;
use tracing::{debug, instrument};

/// Rows of strings with a header line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Cells of the first column whose header contains `header`.
    pub fn column(&self, header: &str) -> Result<Vec<&str>, AutomationError> {
        let index = self
            .headers
            .iter()
            .position(|candidate| candidate.contains(header))
            .ok_or_else(|| {
                AutomationError::ElementNotFound(format!(
                    "column '{header}' not in {:?}",
                    self.headers
                ))
            })?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(index).map(String::as_str))
            .collect())
    }

    pub fn from_csv(text: &str) -> Result<Self, AutomationError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| AutomationError::Parse(format!("table header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| AutomationError::Parse(format!("table row: {e}")))
            })
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { headers, rows })
    }
}

/// Where calendars and price tables come from
pub trait DataSource {
    /// The source's last-modified time, from a metadata-only request.
    /// Non-success statuses are errors.
    fn last_modified(&self, url: &str) -> Result<DateTime<Utc>, AutomationError>;

    fn fetch_table(&self, url: &str) -> Result<Table, AutomationError>;
}

/// Fetches CSV tables over HTTP
pub struct HttpDataSource {
    client: Client,
}

impl HttpDataSource {
    pub fn new() -> Result<Self, AutomationError> {
        let client = Client::builder()
            .user_agent(concat!("autotrade/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AutomationError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl DataSource for HttpDataSource {
    #[instrument(skip(self))]
    fn last_modified(&self, url: &str) -> Result<DateTime<Utc>, AutomationError> {
        let response = self
            .client
            .head(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| AutomationError::Network(format!("HEAD {url} failed: {e}")))?;

        let header = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AutomationError::Network(format!("{url} sent no Last-Modified")))?;
        debug!("Last-Modified: {}", header);

        DateTime::parse_from_rfc2822(header)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|e| AutomationError::Parse(format!("Last-Modified '{header}': {e}")))
    }

    #[instrument(skip(self))]
    fn fetch_table(&self, url: &str) -> Result<Table, AutomationError> {
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| AutomationError::Network(format!("GET {url} failed: {e}")))?;
        Table::from_csv(&body)
    }
}
