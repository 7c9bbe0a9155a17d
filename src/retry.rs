use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::Method;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.5;
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];
/// POST and PATCH are left out: they are not assumed idempotent.
pub const DEFAULT_RETRY_METHODS: [&str; 5] = ["GET", "HEAD", "OPTIONS", "PUT", "DELETE"];

/// Governs which attempts are repeated and how long to wait between them.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub attempts: u32,
    /// Seconds multiplier for the exponential schedule.
    pub backoff_factor: f64,
    /// Response statuses eligible for a retry.
    pub status_codes: BTreeSet<u16>,
    /// Upper-cased method names eligible for a retry.
    methods: BTreeSet<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            status_codes: DEFAULT_RETRY_STATUS_CODES.into_iter().collect(),
            methods: DEFAULT_RETRY_METHODS
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, nothing retried.
    pub fn none() -> Self {
        Self::default().with_attempts(1)
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.status_codes = codes.into_iter().collect();
        self
    }

    /// Replaces the retryable methods; names are matched case-insensitively.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.methods = methods
            .into_iter()
            .map(|method| method.as_ref().trim().to_ascii_uppercase())
            .collect();
        self
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.contains(&method.as_str().to_ascii_uppercase())
    }

    pub fn allows_status(&self, status: u16) -> bool {
        self.status_codes.contains(&status)
    }

    /// Exponential delay before the attempt following `attempt` (1-indexed):
    /// `backoff_factor * 2^(attempt - 1)` seconds.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(30) as i32;
        let seconds = self.backoff_factor * 2f64.powi(exp);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }

    /// Delay before retrying a response.
    ///
    /// A `Retry-After` value overrides the backoff schedule entirely. When the
    /// header is present but not a non-negative number of seconds the retry is
    /// immediate; the schedule is only used when the header is absent.
    pub fn retry_delay(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        match retry_after {
            Some(value) => parse_retry_after(value).unwrap_or(Duration::ZERO),
            None => self.backoff_delay(attempt),
        }
    }
}

/// Parses a `Retry-After` value given in (possibly fractional) seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds = value.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}
