//! Current status and uptime timeline derived from tick history.
//!
//! Tick collections may arrive in any storage order; everything here
//! resolves "latest" by timestamp, never by position.

use chrono::{DateTime, Utc};

use crate::api::{Status, Tick};

/// Number of cells shown in a monitor row's uptime strip.
pub const DEFAULT_TIMELINE_LEN: usize = 5;

/// The tick with the greatest timestamp.
///
/// Ties go to the more severe status (`down` over `up`), so the result does
/// not depend on the order of `ticks`.
pub fn latest_tick(ticks: &[Tick]) -> Option<&Tick> {
    ticks.iter().fold(None, |best: Option<&Tick>, tick| match best {
        Some(b) if (b.time, b.status.severity()) >= (tick.time, tick.status.severity()) => Some(b),
        _ => Some(tick),
    })
}

/// Current status of a monitor: `processing` with no ticks, otherwise the
/// status of the latest tick.
pub fn classify(ticks: &[Tick]) -> Status {
    latest_tick(ticks).map_or(Status::Processing, |t| t.status)
}

/// One cell of the uptime strip.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSlot {
    pub status: Status,
    /// `None` for the placeholder shown before the first observation.
    pub time: Option<DateTime<Utc>>,
    pub response_time_ms: Option<i64>,
}

/// The `len` most recent ticks, oldest first.
///
/// With no ticks this is a single `processing` placeholder.
pub fn timeline(ticks: &[Tick], len: usize) -> Vec<TimelineSlot> {
    if ticks.is_empty() {
        return vec![TimelineSlot {
            status: Status::Processing,
            time: None,
            response_time_ms: None,
        }];
    }

    let mut ordered: Vec<&Tick> = ticks.iter().collect();
    ordered.sort_by_key(|t| (t.time, t.status.severity()));

    let skip = ordered.len().saturating_sub(len);
    ordered
        .into_iter()
        .skip(skip)
        .map(|t| TimelineSlot {
            status: t.status,
            time: Some(t.time),
            response_time_ms: t.response_time_ms,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tick(secs: i64, status: Status) -> Tick {
        Tick::new(Utc.timestamp_opt(secs, 0).unwrap(), status)
    }

    /// Every permutation of `items`, by Heap's algorithm.
    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        fn heap<T: Clone>(k: usize, a: &mut Vec<T>, out: &mut Vec<Vec<T>>) {
            if k <= 1 {
                out.push(a.clone());
                return;
            }
            heap(k - 1, a, out);
            for i in 0..k - 1 {
                if k % 2 == 0 {
                    a.swap(i, k - 1);
                } else {
                    a.swap(0, k - 1);
                }
                heap(k - 1, a, out);
            }
        }
        let mut out = Vec::new();
        heap(items.len(), &mut items.to_vec(), &mut out);
        out
    }

    #[test]
    fn test_empty_is_processing() {
        assert_eq!(classify(&[]), Status::Processing);
        assert!(latest_tick(&[]).is_none());
    }

    #[test]
    fn test_latest_wins_in_either_order() {
        let asc = vec![tick(1, Status::Up), tick(2, Status::Down)];
        let desc = vec![tick(2, Status::Down), tick(1, Status::Up)];
        assert_eq!(classify(&asc), Status::Down);
        assert_eq!(classify(&desc), Status::Down);
    }

    #[test]
    fn test_order_independent() {
        let ticks = vec![
            tick(10, Status::Up),
            tick(40, Status::Down),
            tick(20, Status::Up),
            tick(30, Status::Up),
            tick(5, Status::Down),
        ];
        for perm in permutations(&ticks) {
            assert_eq!(classify(&perm), Status::Down);
        }
    }

    #[test]
    fn test_tie_is_order_independent() {
        let ticks = vec![tick(7, Status::Up), tick(7, Status::Down), tick(3, Status::Up)];
        for perm in permutations(&ticks) {
            assert_eq!(classify(&perm), Status::Down);
            assert_eq!(latest_tick(&perm).unwrap().time.timestamp(), 7);
        }
    }

    #[test]
    fn test_timeline_placeholder() {
        let slots = timeline(&[], DEFAULT_TIMELINE_LEN);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].status, Status::Processing);
        assert!(slots[0].time.is_none());
    }

    #[test]
    fn test_timeline_keeps_most_recent_ascending() {
        let ticks: Vec<Tick> = [9, 3, 7, 1, 5, 11, 2]
            .iter()
            .map(|&s| tick(s, if s == 11 { Status::Down } else { Status::Up }))
            .collect();

        let slots = timeline(&ticks, 3);
        let times: Vec<i64> = slots.iter().map(|s| s.time.unwrap().timestamp()).collect();
        assert_eq!(times, vec![7, 9, 11]);
        assert_eq!(slots.last().unwrap().status, Status::Down);

        assert_eq!(timeline(&ticks, 100).len(), ticks.len());
    }
}
