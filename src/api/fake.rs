//! Scripted in-memory backend for tests that need slow or failing responses.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ApiError, BackendApi, Metrics, Monitor, Tick, UptimeBucket};

/// One scripted tick response: delay, then ticks or an HTTP status.
pub type TickReply = (Duration, Result<Vec<Tick>, u16>);

pub struct FakeBackend {
    pub monitors: Mutex<Result<Vec<Monitor>, u16>>,
    pub tick_replies: Mutex<VecDeque<TickReply>>,
    pub list_calls: AtomicUsize,
    pub tick_calls: AtomicUsize,
    pub tick_regions: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        let fake = Self::default();
        *fake.monitors.lock().unwrap() = Ok(monitors);
        fake
    }

    pub fn set_monitors(&self, monitors: Result<Vec<Monitor>, u16>) {
        *self.monitors.lock().unwrap() = monitors;
    }

    pub fn push_ticks(&self, delay_ms: u64, reply: Result<Vec<Tick>, u16>) {
        self.tick_replies
            .lock()
            .unwrap()
            .push_back((Duration::from_millis(delay_ms), reply));
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn tick_calls(&self) -> usize {
        self.tick_calls.load(Ordering::SeqCst)
    }

    /// Region of every tick request so far, in call order.
    pub fn tick_regions(&self) -> Vec<String> {
        self.tick_regions.lock().unwrap().clone()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            monitors: Mutex::new(Ok(Vec::new())),
            tick_replies: Mutex::new(VecDeque::new()),
            list_calls: AtomicUsize::new(0),
            tick_calls: AtomicUsize::new(0),
            tick_regions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.monitors.lock().unwrap().clone().map_err(ApiError::Status)
    }

    async fn get_monitor(&self, id: &str) -> Result<Monitor, ApiError> {
        self.list_monitors()
            .await?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or(ApiError::NotFound)
    }

    async fn get_ticks(&self, _id: &str, _days: u32, region: &str) -> Result<Vec<Tick>, ApiError> {
        self.tick_calls.fetch_add(1, Ordering::SeqCst);
        self.tick_regions.lock().unwrap().push(region.to_string());
        let reply = self.tick_replies.lock().unwrap().pop_front();
        let (delay, result) = reply.unwrap_or((Duration::ZERO, Ok(Vec::new())));
        tokio::time::sleep(delay).await;
        result.map_err(ApiError::Status)
    }

    async fn get_metrics(&self, _id: &str, _region: &str) -> Result<Metrics, ApiError> {
        Ok(Metrics::default())
    }

    async fn get_uptime(
        &self,
        _id: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<UptimeBucket, ApiError> {
        Err(ApiError::NotFound)
    }
}
