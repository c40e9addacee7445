//! Availability/latency summaries for a monitor.
//!
//! Named buckets come from the backend and keep their order. A user may add
//! one custom date range on top; asking for another replaces it.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::api::{ApiError, BackendApi, Monitor, UptimeBucket};
use crate::clock::Clock;

/// Custom range request failures.
#[derive(Error, Debug)]
pub enum UptimeError {
    #[error("range {from} to {to} is outside {earliest} to {latest}")]
    OutOfRange {
        from: NaiveDate,
        to: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The uptime table of one monitor.
pub struct UptimeAggregator {
    monitor_id: String,
    created_at: DateTime<Utc>,
    buckets: Vec<UptimeBucket>,
    last_request_failed: bool,
    api: Arc<dyn BackendApi>,
    clock: Arc<dyn Clock>,
}

impl UptimeAggregator {
    /// Seed with the monitor's named buckets, in backend order.
    pub fn new(monitor: &Monitor, api: Arc<dyn BackendApi>, clock: Arc<dyn Clock>) -> Self {
        let buckets = monitor
            .named_uptime_buckets
            .iter()
            .cloned()
            .map(|mut b| {
                b.is_custom = false;
                b
            })
            .collect();

        Self {
            monitor_id: monitor.id.clone(),
            created_at: monitor.created_at,
            buckets,
            last_request_failed: false,
            api,
            clock,
        }
    }

    pub fn buckets(&self) -> &[UptimeBucket] {
        &self.buckets
    }

    /// The custom bucket, if one has been requested.
    pub fn custom(&self) -> Option<&UptimeBucket> {
        self.buckets.last().filter(|b| b.is_custom)
    }

    /// Whether the most recent custom range request failed.
    pub fn last_request_failed(&self) -> bool {
        self.last_request_failed
    }

    /// Check that `from..=to` lies between the monitor's creation date and today.
    pub fn check_range(&self, from: NaiveDate, to: NaiveDate) -> Result<(), UptimeError> {
        let earliest = self.created_at.date_naive();
        let latest = self.clock.now().date_naive();

        if from > to || from < earliest || to > latest {
            return Err(UptimeError::OutOfRange {
                from,
                to,
                earliest,
                latest,
            });
        }
        Ok(())
    }

    /// Fetch uptime for `from..=to` and merge it as the custom bucket.
    ///
    /// On any failure the buckets are left exactly as they were.
    pub async fn request_custom_range(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<UptimeBucket, UptimeError> {
        let result = self.fetch_custom(from, to).await;
        self.last_request_failed = result.is_err();

        match result {
            Ok(bucket) => {
                self.merge(bucket.clone());
                Ok(bucket)
            }
            Err(e) => {
                tracing::warn!(
                    "Uptime for monitor {} ({} to {}) unavailable: {}",
                    self.monitor_id,
                    from,
                    to,
                    e
                );
                Err(e)
            }
        }
    }

    async fn fetch_custom(&self, from: NaiveDate, to: NaiveDate) -> Result<UptimeBucket, UptimeError> {
        self.check_range(from, to)?;

        let mut bucket = self.api.get_uptime(&self.monitor_id, from, to).await?;
        bucket.is_custom = true;
        Ok(bucket)
    }

    fn merge(&mut self, bucket: UptimeBucket) {
        if self.custom().is_some() {
            self.buckets.pop();
        }
        self.buckets.push(bucket);
    }
}
