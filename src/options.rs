use std::time::Duration;

use crate::{ClientError, Result};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent` value.
pub const DEFAULT_USER_AGENT: &str = concat!("fluxmgmt-http/", env!("CARGO_PKG_VERSION"));

/// Static client configuration: base URL, timeout, default headers and
/// user agent. Built once, never mutated by the transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    base_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Headers sent with every request, lowest priority.
    pub default_headers: Vec<(String, String)>,
    /// Sent as `User-Agent` unless a header already sets it.
    pub user_agent: String,
}

impl ClientOptions {
    /// Creates options for `base_url`.
    ///
    /// Surrounding whitespace and trailing slashes are stripped; an empty
    /// URL is rejected.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.as_ref())?,
            timeout: DEFAULT_TIMEOUT,
            default_headers: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        })
    }

    /// Reads configuration from the environment.
    ///
    /// - `FLUXMGMT_BASE_URL`: API base URL (required)
    /// - `FLUXMGMT_TIMEOUT_MS`: per-attempt timeout in milliseconds
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("FLUXMGMT_BASE_URL").map_err(|_| {
            ClientError::Auth("missing FLUXMGMT_BASE_URL environment variable".to_owned())
        })?;
        let mut options = Self::new(base_url)?;

        if let Ok(raw) = std::env::var("FLUXMGMT_TIMEOUT_MS") {
            let millis = raw.trim().parse::<u64>().map_err(|_| {
                ClientError::Auth(format!("FLUXMGMT_TIMEOUT_MS is not a number: '{raw}'"))
            })?;
            options.timeout = Duration::from_millis(millis);
        }

        Ok(options)
    }

    /// Normalized base URL, never ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::Auth("base URL is required".to_owned()));
    }
    Ok(trimmed.to_owned())
}
