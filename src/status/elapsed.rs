//! "Last checked" text for a monitor row.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::classify::latest_tick;
use crate::api::Tick;
use crate::clock::Clock;
use crate::scheduler::{every, TimerHandle};

/// How often the text is recomputed while a row is mounted.
pub const REFRESH_PERIOD: Duration = Duration::from_millis(1000);

/// Instant the elapsed time is measured from: the latest tick, or the
/// monitor's creation time before any tick exists.
pub fn anchor(ticks: &[Tick], created_at: DateTime<Utc>) -> DateTime<Utc> {
    latest_tick(ticks).map_or(created_at, |t| t.time)
}

/// Render an elapsed duration as `"<n> minute(s) ago"` or `"<n> second(s) ago"`.
///
/// Negative durations (clock skew) render as zero seconds.
pub fn format_elapsed(elapsed: ChronoDuration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let minutes = secs / 60;
    if minutes > 0 {
        format!("{} minute(s) ago", minutes)
    } else {
        format!("{} second(s) ago", secs % 3600)
    }
}

/// Elapsed text for `ticks` at `now`.
pub fn time_since(ticks: &[Tick], created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_elapsed(now - anchor(ticks, created_at))
}

/// Keeps a row's "last checked" text current while the row is mounted.
///
/// At most one timer runs per ticker: mounting again (because the ticks or
/// creation time changed) replaces the previous timer, and unmounting or
/// dropping the ticker cancels it.
pub struct ElapsedTicker {
    clock: Arc<dyn Clock>,
    text: Arc<watch::Sender<String>>,
    timer: Option<TimerHandle>,
}

impl ElapsedTicker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (tx, _) = watch::channel(String::new());
        Self {
            clock,
            text: Arc::new(tx),
            timer: None,
        }
    }

    /// Receiver for text updates.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.text.subscribe()
    }

    /// Latest rendered text; empty until the first refresh.
    pub fn current(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Start (or restart) the refresh timer for the given anchor inputs.
    pub fn mount(&mut self, ticks: &[Tick], created_at: DateTime<Utc>) {
        self.unmount();

        let anchor = anchor(ticks, created_at);
        let clock = self.clock.clone();
        let text = self.text.clone();

        self.timer = Some(every(REFRESH_PERIOD, move || {
            text.send_replace(format_elapsed(clock.now() - anchor));
            std::future::ready(())
        }));
    }

    /// Cancel the refresh timer. The last rendered text is kept.
    pub fn unmount(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
