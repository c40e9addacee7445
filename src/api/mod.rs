//! Backend API module.
//!
//! Data model for monitors, ticks and uptime buckets, plus the client used
//! to fetch them.

mod client;
mod models;

pub use client::*;
pub use models::*;

#[cfg(test)]
pub(crate) mod fake;
