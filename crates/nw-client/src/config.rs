//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Longest accepted delay between polls.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);

/// How often and how long to wait for a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between read-capability requests
    pub interval: Duration,
    /// Attempts before giving up
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 36, // 3 minutes at the default interval
        }
    }
}

impl PollPolicy {
    /// Upper bound on total polling time.
    pub fn budget(&self) -> Duration {
        self.period() * self.max_attempts
    }

    /// Poll period clamped to `1ms..=MAX_POLL_INTERVAL`.
    pub fn period(&self) -> Duration {
        self.interval
            .clamp(Duration::from_millis(1), MAX_POLL_INTERVAL)
    }
}

/// Configuration for the API client and orchestrator.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API server
    pub api_url: String,
    /// Timeout for API calls and document fetches
    pub request_timeout: Duration,
    /// Timeout for the raw upload
    pub upload_timeout: Duration,
    /// Polling policy
    pub poll: PollPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(600),
            poll: PollPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("NW_API_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.api_url),
            request_timeout: env_secs("NW_REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout),
            upload_timeout: env_secs("NW_UPLOAD_TIMEOUT_SECS").unwrap_or(defaults.upload_timeout),
            poll: PollPolicy {
                interval: env_secs("NW_POLL_INTERVAL_SECS")
                    .map(|interval| interval.min(MAX_POLL_INTERVAL))
                    .unwrap_or(defaults.poll.interval),
                max_attempts: std::env::var("NW_POLL_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(defaults.poll.max_attempts),
            },
        }
    }
}

/// Parse an API base URL, keeping any path prefix joinable.
pub fn parse_api_url(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Config(format!("{} cannot be a base URL", raw)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_secs)
}
