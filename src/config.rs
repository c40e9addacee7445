//! Configuration module for the dashboard engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Dashboard configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend base URL (default: "http://localhost:3001/api/v1")
    pub api_url: String,
    /// Bearer token forwarded to the backend, if any
    pub api_token: Option<String>,
    /// Period of the dashboard-wide monitor list refresh (default: 30s)
    pub refresh_interval: Duration,
    /// `days` window requested when polling ticks (default: 1)
    pub tick_days: u32,
    /// Timeout applied to every backend request (default: 10s)
    pub request_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001/api/v1".to_string(),
            api_token: None,
            refresh_interval: Duration::from_secs(30),
            tick_days: 1,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ECHO_API_URL`: backend base URL
    /// - `ECHO_API_TOKEN`: bearer token
    /// - `ECHO_REFRESH_SECS`: list refresh period in seconds
    /// - `ECHO_TICK_DAYS`: tick history window in days
    /// - `ECHO_REQUEST_TIMEOUT_SECS`: backend request timeout in seconds
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(url) = lookup("ECHO_API_URL").filter(|s| !s.is_empty()) {
            cfg.api_url = url;
        }

        cfg.api_token = lookup("ECHO_API_TOKEN").filter(|s| !s.is_empty());

        if let Some(secs) = parse_positive::<u64>(lookup("ECHO_REFRESH_SECS")) {
            cfg.refresh_interval = Duration::from_secs(secs);
        }

        if let Some(days) = parse_positive(lookup("ECHO_TICK_DAYS")) {
            cfg.tick_days = days;
        }

        if let Some(secs) = parse_positive::<u64>(lookup("ECHO_REQUEST_TIMEOUT_SECS")) {
            cfg.request_timeout = Duration::from_secs(secs);
        }

        cfg
    }
}

fn parse_positive<T: FromStr + PartialOrd + Default>(raw: Option<String>) -> Option<T> {
    raw?.trim().parse::<T>().ok().filter(|v| *v > T::default())
}
