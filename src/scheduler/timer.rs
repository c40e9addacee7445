//! Cancellable timers.
//!
//! Every timer is owned by a [`TimerHandle`]; dropping the handle cancels
//! the timer, so a timer cannot outlive whoever started it. Cancelling stops
//! future firings only: work a timer already started runs to completion,
//! and callers guard its results themselves.

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Owner of a running timer. Cancels it on drop.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    fn new() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        (
            Self {
                token: token.clone(),
            },
            token,
        )
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Run `f` once after `delay`, unless the handle is cancelled first.
pub fn schedule<F, Fut>(delay: Duration, f: F) -> TimerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (handle, token) = TimerHandle::new();

    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        f().await;
    });

    handle
}

/// Run `on_tick` immediately and then every `period` until cancelled.
///
/// Each firing is spawned on its own, so a slow firing never delays the next
/// one. Missed ticks are skipped rather than bunched up.
pub fn every<F, Fut>(period: Duration, mut on_tick: F) -> TimerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (handle, token) = TimerHandle::new();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    tokio::spawn(on_tick());
                }
            }
        }
    });

    handle
}
