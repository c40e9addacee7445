//! Fetched data guarded against out-of-order responses.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{BackendApi, Metrics, Monitor, Status, Tick};
use crate::status::classify;

/// A value together with the request that produced it.
#[derive(Debug, Clone, Default)]
pub struct Versioned<T> {
    pub value: T,
    /// Sequence number of the applied response; 0 for the seed value.
    pub seq: u64,
    /// Failed fetches since the last applied response.
    pub failures: u32,
}

/// Last-known-good state fed by overlapping requests.
///
/// Every request takes a sequence number from [`Sequenced::issue`]. A
/// response is applied only if its number is greater than the one already
/// applied, so a slow early response can never replace a later one.
/// Failures leave the value untouched.
pub struct Sequenced<T> {
    issued: AtomicU64,
    tx: watch::Sender<Versioned<T>>,
}

impl<T> Sequenced<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Versioned {
            value: initial,
            seq: 0,
            failures: 0,
        });
        Self {
            issued: AtomicU64::new(0),
            tx,
        }
    }

    /// Sequence number for a new request.
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a successful response. Returns false if it was stale.
    pub fn apply(&self, seq: u64, value: T) -> bool {
        self.update(seq, |current| *current = value)
    }

    /// Like [`Sequenced::apply`], but edits the current value in place so
    /// parts the response lacks can be kept.
    pub fn update(&self, seq: u64, edit: impl FnOnce(&mut T)) -> bool {
        self.tx.send_if_modified(|current| {
            if seq <= current.seq {
                return false;
            }
            edit(&mut current.value);
            current.seq = seq;
            current.failures = 0;
            true
        })
    }

    /// Record a failed request. The current value stays.
    pub fn fail(&self, seq: u64, err: &dyn Display) {
        self.tx.send_modify(|current| {
            current.failures += 1;
            tracing::warn!(
                "Request #{} failed ({} in a row), keeping data from #{}: {}",
                seq,
                current.failures,
                current.seq,
                err
            );
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Versioned<T>> {
        self.tx.subscribe()
    }

    pub fn borrow(&self) -> watch::Ref<'_, Versioned<T>> {
        self.tx.borrow()
    }
}

/// Ticks and metrics for one monitor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorData {
    pub ticks: Vec<Tick>,
    pub metrics: Option<Metrics>,
}

/// Periodically refreshed tick/metric data for one monitor row.
pub struct MonitorFeed {
    api: Arc<dyn BackendApi>,
    monitor_id: String,
    region: String,
    days: u32,
    data: Sequenced<MonitorData>,
}

impl MonitorFeed {
    /// Seed the feed with the ticks embedded in `monitor`. Polling uses the
    /// monitor's first region.
    pub fn new(api: Arc<dyn BackendApi>, monitor: &Monitor, days: u32) -> Self {
        let region = monitor
            .regions
            .first()
            .map(|r| r.region_name.clone())
            .unwrap_or_default();

        Self {
            api,
            monitor_id: monitor.id.clone(),
            region,
            days,
            data: Sequenced::new(MonitorData {
                ticks: monitor.ticks.clone(),
                metrics: None,
            }),
        }
    }

    pub fn monitor_id(&self) -> &str {
        &self.monitor_id
    }

    pub fn subscribe(&self) -> watch::Receiver<Versioned<MonitorData>> {
        self.data.subscribe()
    }

    pub fn snapshot(&self) -> Versioned<MonitorData> {
        self.data.borrow().clone()
    }

    pub fn status(&self) -> Status {
        classify(&self.data.borrow().value.ticks)
    }

    /// Fetch ticks and metrics and apply them if still current.
    ///
    /// Ticks drive the row, so a response counts as successful whenever the
    /// tick fetch succeeds. A failed metrics fetch keeps the previous metrics.
    pub async fn refresh(self: Arc<Self>) {
        let seq = self.data.issue();
        tracing::debug!("Fetching monitor {} (#{})", self.monitor_id, seq);

        let (ticks, metrics) = tokio::join!(
            self.api.get_ticks(&self.monitor_id, self.days, &self.region),
            self.api.get_metrics(&self.monitor_id, &self.region),
        );

        let ticks = match ticks {
            Ok(ticks) => ticks,
            Err(e) => return self.data.fail(seq, &e),
        };
        let metrics = match metrics {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::warn!(
                    "Metrics for monitor {} (#{}) unavailable, keeping previous: {}",
                    self.monitor_id,
                    seq,
                    e
                );
                None
            }
        };

        let applied = self.data.update(seq, |data| {
            data.ticks = ticks;
            if metrics.is_some() {
                data.metrics = metrics;
            }
        });
        if !applied {
            tracing::debug!(
                "Discarding stale response #{} for monitor {}",
                seq,
                self.monitor_id
            );
        }
    }
}
