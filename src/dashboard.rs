//! Monitor rows wired to their timers.
//!
//! Stands where the UI layer would: mounting a row starts its polling and
//! "last checked" timers, unmounting releases them.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, BackendApi, Monitor, Status, UptimeBucket};
use crate::clock::Clock;
use crate::config::DashboardConfig;
use crate::scheduler::{DashboardRefresh, MonitorData, MonitorFeed, Scheduler, Versioned};
use crate::status::{classify, timeline, ElapsedTicker, TimelineSlot, DEFAULT_TIMELINE_LEN};
use crate::uptime::{UptimeAggregator, UptimeError};

/// How often [`Dashboard::run`] picks up feed changes.
const FRAME_PERIOD: Duration = Duration::from_secs(1);

/// What a row displays.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: String,
    pub url: String,
    pub status: Status,
    pub last_checked: String,
    pub timeline: Vec<TimelineSlot>,
}

struct MonitorRow {
    monitor: Monitor,
    feed: Arc<MonitorFeed>,
    feed_rx: watch::Receiver<Versioned<MonitorData>>,
    ticker: ElapsedTicker,
    uptime: UptimeAggregator,
    status: Status,
}

pub struct Dashboard {
    api: Arc<dyn BackendApi>,
    clock: Arc<dyn Clock>,
    tick_days: u32,
    scheduler: Scheduler,
    refresh: DashboardRefresh,
    rows: HashMap<String, MonitorRow>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn BackendApi>, clock: Arc<dyn Clock>, cfg: &DashboardConfig) -> Self {
        Self {
            refresh: DashboardRefresh::new(api.clone(), cfg.refresh_interval),
            api,
            clock,
            tick_days: cfg.tick_days,
            scheduler: Scheduler::new(),
            rows: HashMap::new(),
        }
    }

    /// Mount a row, or update an already mounted one.
    ///
    /// A changed frequency restarts the row's polling timer. Changed regions
    /// or creation time rebuild the row.
    pub fn mount(&mut self, monitor: Monitor) {
        if let Some(row) = self.rows.get_mut(&monitor.id) {
            if row.monitor.regions == monitor.regions && row.monitor.created_at == monitor.created_at {
                self.scheduler.poll_monitor(&monitor, row.feed.clone());
                row.monitor = monitor;
                return;
            }
            tracing::debug!("Rebuilding row for {} ({})", monitor.url, monitor.id);
            self.unmount(&monitor.id);
        } else {
            tracing::debug!("Mounting row for {} ({})", monitor.url, monitor.id);
        }

        let feed = Arc::new(MonitorFeed::new(self.api.clone(), &monitor, self.tick_days));
        let mut ticker = ElapsedTicker::new(self.clock.clone());
        ticker.mount(&monitor.ticks, monitor.created_at);
        self.scheduler.poll_monitor(&monitor, feed.clone());

        let row = MonitorRow {
            feed_rx: feed.subscribe(),
            uptime: UptimeAggregator::new(&monitor, self.api.clone(), self.clock.clone()),
            status: classify(&monitor.ticks),
            monitor,
            feed,
            ticker,
        };
        self.rows.insert(row.monitor.id.clone(), row);
    }

    /// Unmount a row, stopping its timers.
    pub fn unmount(&mut self, monitor_id: &str) -> bool {
        self.scheduler.stop(monitor_id);
        match self.rows.remove(monitor_id) {
            Some(mut row) => {
                row.ticker.unmount();
                tracing::debug!("Unmounted row for {}", row.monitor.url);
                true
            }
            None => false,
        }
    }

    /// Make the mounted rows match `monitors`.
    pub fn sync(&mut self, monitors: Vec<Monitor>) {
        let gone: Vec<String> = self
            .rows
            .keys()
            .filter(|id| !monitors.iter().any(|m| &m.id == *id))
            .cloned()
            .collect();

        for id in gone {
            self.unmount(&id);
        }
        for monitor in monitors {
            self.mount(monitor);
        }
    }

    /// Apply feed updates to their rows.
    ///
    /// Returns the rows whose status changed, with the new status.
    pub fn pump(&mut self) -> Vec<(String, Status)> {
        let mut changed = Vec::new();

        for (id, row) in self.rows.iter_mut() {
            if !row.feed_rx.has_changed().unwrap_or(false) {
                continue;
            }
            let ticks = row.feed_rx.borrow_and_update().value.ticks.clone();
            row.ticker.mount(&ticks, row.monitor.created_at);

            let status = classify(&ticks);
            if status != row.status {
                row.status = status;
                changed.push((id.clone(), status));
            }
        }

        changed
    }

    pub fn row(&self, monitor_id: &str) -> Option<RowView> {
        let row = self.rows.get(monitor_id)?;
        let ticks = row.feed.snapshot().value.ticks;

        Some(RowView {
            id: row.monitor.id.clone(),
            url: row.monitor.url.clone(),
            status: row.status,
            last_checked: row.ticker.current(),
            timeline: timeline(&ticks, DEFAULT_TIMELINE_LEN),
        })
    }

    pub fn rows(&self) -> Vec<RowView> {
        let mut ids: Vec<&String> = self.rows.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.row(id)).collect()
    }

    pub fn uptime_buckets(&self, monitor_id: &str) -> Option<&[UptimeBucket]> {
        self.rows.get(monitor_id).map(|r| r.uptime.buckets())
    }

    /// Request a custom uptime range for a mounted row.
    pub async fn request_custom_range(
        &mut self,
        monitor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<UptimeBucket, UptimeError> {
        let row = self
            .rows
            .get_mut(monitor_id)
            .ok_or(UptimeError::Api(ApiError::NotFound))?;
        row.uptime.request_custom_range(from, to).await
    }

    /// Drive the dashboard until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut list_rx = self.refresh.subscribe();
        self.refresh.start();

        let mut frame = tokio::time::interval(FRAME_PERIOD);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = list_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let monitors = list_rx.borrow_and_update().value.clone();
                    self.sync(monitors);
                }
                _ = frame.tick() => {
                    for (id, status) in self.pump() {
                        if let Some(view) = self.row(&id) {
                            tracing::info!("{} is {} (last checked {})", view.url, status, view.last_checked);
                        }
                    }
                }
            }
        }

        self.shutdown();
    }

    /// Stop every timer and unmount all rows.
    pub fn shutdown(&mut self) {
        self.refresh.stop();
        self.scheduler.stop_all();
        for (_, mut row) in self.rows.drain() {
            row.ticker.unmount();
        }
        tracing::info!("Dashboard stopped");
    }
}
