//! HTTP HEAD probe implementation.

use async_trait::async_trait;
use reqwest::{redirect, Url};
use std::time::Duration;

use super::ProbeError;

/// Timeout for a single reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Checks whether a URL answers.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UrlProbe: Send + Sync {
    /// Returns the HTTP status of the response. Any status counts as an
    /// answer; only transport failures are errors.
    async fn probe(&self, url: &str) -> Result<u16, ProbeError>;
}

/// [`UrlProbe`] issuing a HEAD request with reqwest.
///
/// The client keeps no cookie store and sends no credentials.
pub struct HttpUrlProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpUrlProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl UrlProbe for HttpUrlProbe {
    async fn probe(&self, url: &str) -> Result<u16, ProbeError> {
        let url = Url::parse(url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        let response = self.client.head(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else if e.is_connect() {
                ProbeError::Connect(e.to_string())
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        tracing::debug!("HEAD {} -> {}", url, status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_http_probe_invalid_url() {
        let probe = HttpUrlProbe::new(Duration::from_millis(100)).unwrap();

        let err = assert_err!(probe.probe("http://256.256.256.256").await);
        assert!(matches!(err, ProbeError::InvalidUrl(_)), "{err:?}");

        let err = assert_err!(probe.probe("ftp://example.com").await);
        assert!(matches!(err, ProbeError::InvalidUrl(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_http_probe_connection_refused() {
        let probe = HttpUrlProbe::new(Duration::from_secs(2)).unwrap();
        let err = assert_err!(probe.probe("http://127.0.0.1:1/").await);
        assert!(matches!(err, ProbeError::Connect(_)), "{err:?}");
        assert_eq!(err.reason(), "connection failed");
    }
}
