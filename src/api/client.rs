//! Backend REST client.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use super::models::*;
use crate::config::DashboardConfig;

/// Backend call failures.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("Not found")]
    NotFound,
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only view of the dashboard backend.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait BackendApi: Send + Sync {
    /// `GET /website`
    async fn list_monitors(&self) -> Result<Vec<Monitor>, ApiError>;

    /// `GET /website/:id`
    async fn get_monitor(&self, id: &str) -> Result<Monitor, ApiError>;

    /// `GET /website/ticks/:id?days=&region=`
    async fn get_ticks(&self, id: &str, days: u32, region: &str) -> Result<Vec<Tick>, ApiError>;

    /// `GET /website/metrics/:id?region=`
    async fn get_metrics(&self, id: &str, region: &str) -> Result<Metrics, ApiError>;

    /// `GET /website/uptime/:id?from=&to=`
    async fn get_uptime(
        &self,
        id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<UptimeBucket, ApiError>;
}

/// [`BackendApi`] over HTTP/JSON.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(cfg: &DashboardConfig) -> Result<Self, ApiError> {
        Self::new(&cfg.api_url, cfg.api_token.clone(), cfg.request_timeout)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status.as_u16(), body.len());
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, ApiError> {
        let monitors: Option<Vec<Monitor>> = self.get_json("/website", &[]).await?;
        Ok(monitors.unwrap_or_default())
    }

    async fn get_monitor(&self, id: &str) -> Result<Monitor, ApiError> {
        self.get_json(&format!("/website/{}", id), &[]).await
    }

    async fn get_ticks(&self, id: &str, days: u32, region: &str) -> Result<Vec<Tick>, ApiError> {
        let ticks: Option<Vec<Tick>> = self
            .get_json(
                &format!("/website/ticks/{}", id),
                &[("days", days.to_string()), ("region", region.to_string())],
            )
            .await?;
        Ok(ticks.unwrap_or_default())
    }

    async fn get_metrics(&self, id: &str, region: &str) -> Result<Metrics, ApiError> {
        self.get_json(
            &format!("/website/metrics/{}", id),
            &[("region", region.to_string())],
        )
        .await
    }

    async fn get_uptime(
        &self,
        id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<UptimeBucket, ApiError> {
        self.get_json(
            &format!("/website/uptime/{}", id),
            &[
                ("from", from.format("%Y-%m-%d").to_string()),
                ("to", to.format("%Y-%m-%d").to_string()),
            ],
        )
        .await
    }
}
