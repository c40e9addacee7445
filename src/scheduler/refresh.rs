//! Dashboard-wide refresh of the monitor list.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use super::feed::{Sequenced, Versioned};
use super::timer::{every, TimerHandle};
use crate::api::{BackendApi, Monitor};

/// Default period of the list refresh.
pub const DASHBOARD_REFRESH: Duration = Duration::from_secs(30);

/// Re-fetches `GET /website` on a fixed period, independent of the
/// per-monitor timers.
pub struct DashboardRefresh {
    api: Arc<dyn BackendApi>,
    period: Duration,
    list: Arc<Sequenced<Vec<Monitor>>>,
    timer: Mutex<Option<TimerHandle>>,
}

impl DashboardRefresh {
    pub fn new(api: Arc<dyn BackendApi>, period: Duration) -> Self {
        Self {
            api,
            period,
            list: Arc::new(Sequenced::new(Vec::new())),
            timer: Mutex::new(None),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<TimerHandle>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the refresh timer, replacing any running one.
    pub fn start(&self) {
        let mut slot = self.timer();
        if let Some(old) = slot.take() {
            old.cancel();
        }

        let api = self.api.clone();
        let list = self.list.clone();

        tracing::info!("Dashboard refresh every {:?}", self.period);
        *slot = Some(every(self.period, move || {
            let api = api.clone();
            let list = list.clone();
            async move { refresh_list(api.as_ref(), &list).await }
        }));
    }

    /// Stop the refresh timer.
    pub fn stop(&self) {
        if let Some(timer) = self.timer().take() {
            timer.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Versioned<Vec<Monitor>>> {
        self.list.subscribe()
    }

    /// Last successfully fetched monitor list.
    pub fn monitors(&self) -> Vec<Monitor> {
        self.list.borrow().value.clone()
    }
}

async fn refresh_list(api: &dyn BackendApi, list: &Sequenced<Vec<Monitor>>) {
    let seq = list.issue();
    match api.list_monitors().await {
        Ok(monitors) => {
            tracing::debug!("Monitor list #{}: {} monitors", seq, monitors.len());
            if !list.apply(seq, monitors) {
                tracing::debug!("Discarding stale monitor list #{}", seq);
            }
        }
        Err(e) => list.fail(seq, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;

    fn monitor(id: &str) -> Monitor {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "url": format!("https://{}.example", id),
            "frequency": "30s",
            "created_at": "2026-10-01T00:00:00Z",
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_on_period() {
        let api = Arc::new(FakeBackend::with_monitors(vec![monitor("a")]));
        let refresh = DashboardRefresh::new(api.clone(), DASHBOARD_REFRESH);

        refresh.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.list_calls(), 1);
        assert_eq!(refresh.monitors().len(), 1);

        api.set_monitors(Ok(vec![monitor("a"), monitor("b")]));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.list_calls(), 2);
        assert_eq!(refresh.monitors().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_list_and_timer() {
        let api = Arc::new(FakeBackend::with_monitors(vec![monitor("a")]));
        let refresh = DashboardRefresh::new(api.clone(), DASHBOARD_REFRESH);
        refresh.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        api.set_monitors(Err(500));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.list_calls(), 3);
        assert_eq!(refresh.monitors()[0].id, "a");
        assert!(refresh.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_restart_never_doubles_up() {
        let api = Arc::new(FakeBackend::default());
        let refresh = DashboardRefresh::new(api.clone(), DASHBOARD_REFRESH);

        refresh.start();
        tokio::time::sleep(Duration::from_secs(10)).await;
        refresh.start();
        tokio::time::sleep(Duration::from_secs(25)).await;
        // Restart fetched at 0 and 10; the replaced timer's 30s tick never ran.
        assert_eq!(api.list_calls(), 2);

        refresh.stop();
        assert!(!refresh.is_running());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.list_calls(), 2);
    }
}
