//! Debounced reachability check for the monitor form's URL field.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use super::UrlProbe;
use crate::scheduler::{schedule, TimerHandle};

/// Quiet period the input must hold before a probe is sent.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Initial value of the URL field; never probed.
pub const PLACEHOLDER_URL: &str = "https://";

/// What the form shows next to the URL field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Reachability {
    /// Nothing worth probing has been entered.
    #[default]
    Idle,
    Pending,
    Reachable,
    Unreachable(String),
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable)
    }
}

/// Probes the latest input once it has been stable for [`DEBOUNCE`].
///
/// Each input gets a request id. A probe result is published only if its
/// id is still the latest when it arrives; anything older is dropped.
pub struct ReachabilityProbe {
    prober: Arc<dyn UrlProbe>,
    debounce: Duration,
    state: Arc<watch::Sender<Reachability>>,
    latest: Arc<AtomicU64>,
    pending: Mutex<Option<TimerHandle>>,
}

impl ReachabilityProbe {
    pub fn new(prober: Arc<dyn UrlProbe>) -> Self {
        Self::with_debounce(prober, DEBOUNCE)
    }

    pub fn with_debounce(prober: Arc<dyn UrlProbe>, debounce: Duration) -> Self {
        let (tx, _) = watch::channel(Reachability::Idle);
        Self {
            prober,
            debounce,
            state: Arc::new(tx),
            latest: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Reachability> {
        self.state.subscribe()
    }

    pub fn state(&self) -> Reachability {
        self.state.borrow().clone()
    }

    /// Feed the current contents of the URL field.
    pub fn on_input(&self, raw: &str) {
        let url = raw.trim().to_string();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(timer) = pending.take() {
            timer.cancel();
        }

        if url.is_empty() || url == PLACEHOLDER_URL {
            self.go_idle();
            return;
        }

        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let prober = self.prober.clone();
        let state = self.state.clone();
        let latest = self.latest.clone();

        *pending = Some(schedule(self.debounce, move || async move {
            if !publish_if_current(&state, &latest, id, Reachability::Pending) {
                return;
            }

            let outcome = match prober.probe(&url).await {
                Ok(status) => {
                    tracing::debug!("{} answered with {}", url, status);
                    Reachability::Reachable
                }
                Err(e) => {
                    tracing::info!("{} is unreachable: {}", url, e);
                    Reachability::Unreachable(e.reason())
                }
            };

            if !publish_if_current(&state, &latest, id, outcome) {
                tracing::debug!("Discarding superseded probe result for {}", url);
            }
        }));
    }

    /// Abandon any scheduled or in-flight probe and return to idle.
    pub fn reset(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.cancel();
        }
        self.go_idle();
    }

    /// Supersede every outstanding request and show `Idle`, as one step.
    fn go_idle(&self) {
        self.state.send_modify(|s| {
            self.latest.fetch_add(1, Ordering::SeqCst);
            *s = Reachability::Idle;
        });
    }
}

/// Publish `next` only if request `id` is still the latest.
///
/// The check runs under the channel's write lock, so it cannot interleave
/// with [`ReachabilityProbe::reset`] or a degenerate input.
fn publish_if_current(
    state: &watch::Sender<Reachability>,
    latest: &AtomicU64,
    id: u64,
    next: Reachability,
) -> bool {
    state.send_if_modified(|s| {
        if latest.load(Ordering::SeqCst) != id {
            return false;
        }
        *s = next;
        true
    })
}
