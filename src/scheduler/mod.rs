//! Scheduler module for keeping monitor data fresh.
//!
//! Owns one polling timer per monitor plus the timer primitives the rest of
//! the engine builds on.

mod feed;
mod refresh;
mod timer;

pub use feed::*;
pub use refresh::*;
pub use timer::*;

use crate::api::Monitor;
use crate::frequency;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct Running {
    interval: Duration,
    handle: TimerHandle,
}

/// Per-monitor polling timers, keyed by monitor id.
///
/// The host calls [`Scheduler::start`] when a row mounts and
/// [`Scheduler::stop`] when it unmounts. Starting an id that already has a
/// timer replaces it, so there is never more than one timer per monitor.
#[derive(Default)]
pub struct Scheduler {
    timers: Mutex<HashMap<String, Running>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<String, Running>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `on_tick` now and every `interval` for `monitor_id`.
    pub fn start<F, Fut>(&self, monitor_id: &str, interval: Duration, on_tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.timers();

        if let Some(old) = timers.remove(monitor_id) {
            old.handle.cancel();
            tracing::info!(
                "Scheduler: Restarting monitor {} ({:?} -> {:?})",
                monitor_id,
                old.interval,
                interval
            );
        } else {
            tracing::info!("Scheduler: Adding monitor {} every {:?}", monitor_id, interval);
        }

        timers.insert(
            monitor_id.to_string(),
            Running {
                interval,
                handle: every(interval, on_tick),
            },
        );
    }

    /// Cancel the timer for `monitor_id`. Returns false if none was running.
    pub fn stop(&self, monitor_id: &str) -> bool {
        match self.timers().remove(monitor_id) {
            Some(running) => {
                running.handle.cancel();
                tracing::info!("Scheduler: Removed monitor {}", monitor_id);
                true
            }
            None => false,
        }
    }

    /// Cancel every timer.
    pub fn stop_all(&self) {
        for (_, running) in self.timers().drain() {
            running.handle.cancel();
        }
    }

    pub fn interval_of(&self, monitor_id: &str) -> Option<Duration> {
        self.timers().get(monitor_id).map(|r| r.interval)
    }

    pub fn len(&self) -> usize {
        self.timers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll `feed` at the monitor's configured frequency.
    ///
    /// Does nothing if the monitor is already polled at that interval;
    /// otherwise (re)starts its timer. Returns whether a timer was started.
    pub fn poll_monitor(&self, monitor: &Monitor, feed: Arc<MonitorFeed>) -> bool {
        let interval = frequency::to_duration(&monitor.frequency_code);
        if self.interval_of(&monitor.id) == Some(interval) {
            return false;
        }

        self.start(&monitor.id, interval, move || feed.clone().refresh());
        true
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn monitor(id: &str, frequency: &str) -> Monitor {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "url": "https://example.com",
            "frequency": frequency,
            "regions": ["in"],
            "created_at": "2026-10-01T00:00:00Z",
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.start("m1", Duration::from_secs(60), move || {
            c.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        });
        assert_eq!(scheduler.interval_of("m1"), Some(Duration::from_secs(60)));

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert!(scheduler.stop("m1"));
        assert!(!scheduler.stop("m1"));
        assert!(scheduler.is_empty());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_fetch_per_interval_and_frequency_change() {
        let api = Arc::new(FakeBackend::default());
        let scheduler = Scheduler::new();

        let m = monitor("m1", "1m");
        let feed = Arc::new(MonitorFeed::new(api.clone(), &m, 1));
        assert!(scheduler.poll_monitor(&m, feed.clone()));
        assert!(!scheduler.poll_monitor(&m, feed.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.tick_calls(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.tick_calls(), 2);

        // t = 90s: switch to 30s. Fetches immediately, then at 120s, 150s.
        tokio::time::sleep(Duration::from_secs(30)).await;
        let m = monitor("m1", "30s");
        assert!(scheduler.poll_monitor(&m, feed.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.tick_calls(), 3);

        // The old 1m timer would also have fired at 120s.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.tick_calls(), 4);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.tick_calls(), 5);
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitors_are_independent() {
        let api = Arc::new(FakeBackend::default());
        let scheduler = Scheduler::new();

        for (id, freq) in [("a", "30s"), ("b", "1m")] {
            let m = monitor(id, freq);
            scheduler.poll_monitor(&m, Arc::new(MonitorFeed::new(api.clone(), &m, 1)));
        }
        tokio::time::sleep(Duration::from_secs(61)).await;
        // a: 0, 30, 60; b: 0, 60
        assert_eq!(api.tick_calls(), 5);

        scheduler.stop("a");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.tick_calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_everything() {
        let api = Arc::new(FakeBackend::default());
        let scheduler = Scheduler::new();
        let m = monitor("m1", "30s");
        scheduler.poll_monitor(&m, Arc::new(MonitorFeed::new(api.clone(), &m, 1)));
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(scheduler);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(api.tick_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poisoned_lock_still_stops_timers() {
        let scheduler = Arc::new(Scheduler::new());
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.start("m1", Duration::from_secs(60), move || {
            c.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let s = scheduler.clone();
        let _ = std::thread::spawn(move || {
            let _guard = s.timers.lock().unwrap();
            panic!("panicked while holding the timer map");
        })
        .join();
        assert!(scheduler.timers.is_poisoned());

        assert_eq!(scheduler.interval_of("m1"), Some(Duration::from_secs(60)));
        assert!(scheduler.stop("m1"));
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
