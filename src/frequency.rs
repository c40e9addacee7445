//! Check-frequency codes.
//!
//! A monitor's frequency is stored as a compact code such as `"30s"` or
//! `"5m"`. Anything that does not parse falls back to [`DEFAULT_INTERVAL_MS`].

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Interval used when a frequency code cannot be parsed.
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// Convert a frequency code (`"<n>s"` or `"<n>m"`) to milliseconds.
///
/// Never fails: empty, malformed, zero or overflowing codes yield
/// [`DEFAULT_INTERVAL_MS`].
pub fn to_milliseconds(code: &str) -> u64 {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(\d+)([sm])$").unwrap());

    let Some(caps) = re.captures(code) else {
        return DEFAULT_INTERVAL_MS;
    };

    let Ok(value) = caps[1].parse::<u64>() else {
        return DEFAULT_INTERVAL_MS;
    };

    let unit_ms = match &caps[2] {
        "s" => 1_000,
        "m" => 60_000,
        _ => return DEFAULT_INTERVAL_MS,
    };

    match value.checked_mul(unit_ms) {
        Some(0) | None => DEFAULT_INTERVAL_MS,
        Some(ms) => ms,
    }
}

/// Same as [`to_milliseconds`], as a [`Duration`].
pub fn to_duration(code: &str) -> Duration {
    Duration::from_millis(to_milliseconds(code))
}
