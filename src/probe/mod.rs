//! Probe module for candidate monitor URLs.
//!
//! A single HEAD request answers "does this URL respond at all", and
//! [`ReachabilityProbe`] debounces those requests behind a text field.

mod http;
mod reachability;

pub use http::*;
pub use reachability::*;

use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ProbeError {
    /// Short reason shown next to the URL field.
    pub fn reason(&self) -> String {
        match self {
            ProbeError::Timeout(_) => "timeout",
            ProbeError::Connect(_) => "connection failed",
            ProbeError::Network(_) => "unexpected error",
            ProbeError::InvalidUrl(_) => "invalid url",
        }
        .to_string()
    }
}
