//! Echo Monitor - client-side status engine for an uptime dashboard.
//!
//! Turns backend monitor data into per-row status, "last checked" text and
//! uptime summaries, and keeps it fresh with per-monitor polling timers.

pub mod api;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod frequency;
pub mod probe;
pub mod scheduler;
pub mod status;
pub mod uptime;
