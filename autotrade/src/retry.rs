use crate::errors::AutomationError;
use std::thread;
use std::time::Duration;
use tracing::trace;

const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// How a "block until observed" loop polls.
///
/// Production loops are unbounded; the only way out of them is an operator
/// interrupt. Tests bound them so a scripted collaborator cannot hang the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::until_observed(DEFAULT_RETRY_INTERVAL)
    }
}

impl RetryPolicy {
    pub fn until_observed(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    /// Calls `probe` until it yields a value, sleeping `interval` between attempts.
    pub fn poll<T, F>(&self, what: &str, mut probe: F) -> Result<T, AutomationError>
    where
        F: FnMut() -> Option<T>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            if let Some(value) = probe() {
                return Ok(value);
            }
            if let Some(max) = self.max_attempts {
                if attempt >= max {
                    return Err(AutomationError::Timeout(format!(
                        "{what} not observed after {attempt} attempts"
                    )));
                }
            }
            trace!(attempt, "{} not observed yet", what);
            thread::sleep(self.interval);
        }
    }

    /// Like [`poll`](Self::poll) for fallible probes: transient errors count as
    /// "not yet", anything else is returned immediately.
    pub fn retry<T, F>(&self, what: &str, mut attempt: F) -> Result<T, AutomationError>
    where
        F: FnMut() -> Result<Option<T>, AutomationError>,
    {
        let mut fatal = None;
        let result = self.poll(what, || match attempt() {
            Ok(value) => value.map(Some),
            Err(e) if e.is_transient() => {
                trace!("{} attempt failed: {}", what, e);
                None
            }
            Err(e) => {
                fatal = Some(e);
                Some(None)
            }
        })?;
        match (result, fatal) {
            (_, Some(e)) => Err(e),
            (Some(value), None) => Ok(value),
            (None, None) => Err(AutomationError::Internal(format!(
                "{what} finished without a value"
            ))),
        }
    }
}
