//! Backend data model types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Current or observed health of a monitor.
///
/// `Processing` means "no observation yet" and is never recorded by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    /// The backend records an indeterminate probe outcome as `"unknown"`.
    #[serde(alias = "unknown")]
    Down,
    #[default]
    Processing,
}

impl Status {
    /// Rank used to break ties between ticks sharing a timestamp.
    pub(crate) fn severity(self) -> u8 {
        match self {
            Status::Processing => 0,
            Status::Up => 1,
            Status::Down => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Up => write!(f, "Up"),
            Status::Down => write!(f, "Down"),
            Status::Processing => write!(f, "Processing"),
        }
    }
}

/// A probing location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub region_id: String,
    pub region_name: String,
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The list endpoint sends bare region names, the detail endpoint sends objects.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Name(String),
            Object {
                #[serde(alias = "regionId", alias = "id")]
                region_id: String,
                #[serde(alias = "regionName", alias = "name")]
                region_name: String,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Name(name) => Region {
                region_id: name.clone(),
                region_name: name,
            },
            Wire::Object {
                region_id,
                region_name,
            } => Region {
                region_id,
                region_name,
            },
        })
    }
}

/// A single health observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub time: DateTime<Utc>,
    pub status: Status,
    #[serde(rename = "responseTime", default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<i64>,
    #[serde(
        rename = "regionName",
        alias = "region_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub region_name: Option<String>,
}

impl Tick {
    pub fn new(time: DateTime<Utc>, status: Status) -> Self {
        Self {
            time,
            status,
            response_time_ms: None,
            region_name: None,
        }
    }
}

/// A monitored website as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub url: String,
    #[serde(rename = "frequency", deserialize_with = "frequency_code")]
    pub frequency_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub regions: Vec<Region>,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ticks: Vec<Tick>,
    #[serde(rename = "uptime", default, deserialize_with = "null_as_default")]
    pub named_uptime_buckets: Vec<UptimeBucket>,
}

/// One latency/availability value with its value from the previous period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    pub current: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

/// Percentile breakdown of one metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    #[serde(rename = "P99")]
    pub p99: MetricData,
    #[serde(rename = "P95")]
    pub p95: MetricData,
    #[serde(rename = "P90")]
    pub p90: MetricData,
}

/// Summary returned by `/website/metrics/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub response: Percentiles,
    pub status: Percentiles,
    pub availability: Percentiles,
}

/// Availability and latency over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UptimePayload")]
pub struct UptimeBucket {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub availability_pct: f64,
    pub avg_response_time_ms: f64,
    pub is_custom: bool,
}

impl UptimeBucket {
    /// Display label.
    ///
    /// Custom buckets show the literal date span; named buckets show
    /// "Today" or "Last N days" from the whole-day difference.
    pub fn label(&self) -> String {
        if self.is_custom {
            return format!(
                "{} to {}",
                self.range_start.format("%-d %B, %Y"),
                self.range_end.format("%-d %B, %Y")
            );
        }

        let days = (self.range_end - self.range_start).num_days();
        if days == 0 {
            "Today".to_string()
        } else {
            format!("Last {} days", days)
        }
    }
}

/// Uptime row exactly as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct UptimePayload {
    pub time: String,
    pub availability: String,
    pub avg_response_time: String,
    #[serde(default)]
    pub custom: bool,
}

impl TryFrom<UptimePayload> for UptimeBucket {
    type Error = String;

    fn try_from(payload: UptimePayload) -> Result<Self, Self::Error> {
        let (from, to) = payload
            .time
            .split_once(',')
            .ok_or_else(|| format!("uptime range {:?} has no separator", payload.time))?;

        let range_start = parse_api_date(from.trim())
            .ok_or_else(|| format!("invalid range start {:?}", from))?;
        let range_end =
            parse_api_date(to.trim()).ok_or_else(|| format!("invalid range end {:?}", to))?;

        Ok(Self {
            range_start,
            range_end,
            availability_pct: parse_quantity(&payload.availability, "%")?,
            avg_response_time_ms: parse_quantity(&payload.avg_response_time, "ms")?,
            is_custom: payload.custom,
        })
    }
}

/// Parse a number with an optional trailing unit, e.g. `"99.5%"` or `"120.25 MS"`.
fn parse_quantity(raw: &str, unit: &str) -> Result<f64, String> {
    let trimmed = raw.trim();
    let split = trimmed.len().saturating_sub(unit.len());
    let number = match trimmed.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case(unit) => &trimmed[..split],
        _ => trimmed,
    };

    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid quantity {:?}", raw))
}

/// Parse a date or datetime string from the API into a calendar date.
pub(crate) fn parse_api_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Accept a frequency code string or a Go duration in nanoseconds.
fn frequency_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Code(String),
        Nanos(u64),
    }

    Ok(match Wire::deserialize(deserializer)? {
        Wire::Code(code) => code,
        Wire::Nanos(nanos) => {
            let secs = nanos / 1_000_000_000;
            if secs > 0 && secs % 60 == 0 {
                format!("{}m", secs / 60)
            } else {
                format!("{}s", secs)
            }
        }
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
