//! Rolling window aggregation of raw results into chart buckets.

use super::classify::classify;
use crate::api::{RawResult, TimeRange};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

/// Shape of the trailing window set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    /// Number of buckets produced.
    pub count: usize,
    /// Width of each bucket.
    pub width: ChronoDuration,
    /// Distance between the start of the current window and the end of the last bucket.
    pub trailing_offset: ChronoDuration,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            count: 10,
            width: ChronoDuration::minutes(1),
            trailing_offset: ChronoDuration::minutes(1),
        }
    }
}

/// Upper bound on the number of windows in a spec.
pub const MAX_WINDOW_COUNT: usize = 1440;
/// Upper bound on the width of one window, in seconds.
pub const MAX_WINDOW_SECS: i64 = 24 * 60 * 60;

impl WindowSpec {
    /// `count` windows of `width_secs` each, trailing by one window.
    ///
    /// Both values are clamped to `1..=MAX_WINDOW_SECS` and `..=MAX_WINDOW_COUNT`.
    pub fn new(count: usize, width_secs: i64) -> Self {
        let width = ChronoDuration::try_seconds(width_secs.clamp(1, MAX_WINDOW_SECS))
            .unwrap_or_else(|| ChronoDuration::minutes(1));
        Self {
            count: count.min(MAX_WINDOW_COUNT),
            width,
            trailing_offset: width,
        }
    }

    fn width_secs(&self) -> i64 {
        self.width.num_seconds().max(1)
    }

    /// Window start instants in ascending order.
    ///
    /// The last window ends `trailing_offset` before the start of the window
    /// containing `now`, so the current, incomplete window is never included.
    /// Windows that would start before the representable time range are left out.
    pub fn window_starts(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let width = self.width_secs();
        let anchor = truncate_to_window(now, width);

        (0..self.count)
            .rev()
            .filter_map(|k| {
                let back = ChronoDuration::try_seconds(width.checked_mul(i64::try_from(k).ok()?)?)?;
                let offset = self.trailing_offset.checked_add(&back)?;
                let start = anchor.checked_sub_signed(offset)?;
                Some(truncate_to_window(start, width))
            })
            .collect()
    }

    /// Half-open range covering exactly the generated windows.
    pub fn range(&self, now: DateTime<Utc>) -> TimeRange {
        let starts = self.window_starts(now);
        match (starts.first(), starts.last()) {
            (Some(first), Some(last)) => TimeRange {
                from: *first,
                to: ChronoDuration::try_seconds(self.width_secs())
                    .and_then(|width| last.checked_add_signed(width))
                    .unwrap_or(*last),
            },
            _ => {
                let anchor = truncate_to_window(now, self.width_secs());
                TimeRange {
                    from: anchor,
                    to: anchor,
                }
            }
        }
    }
}

/// Response-class counters, present only for HTTP checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HttpBreakdown {
    pub timeout_count: u64,
    pub count_2xx: u64,
    pub count_4xx: u64,
    pub count_5xx: u64,
}

/// Statistics for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub window_start: DateTime<Utc>,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpBreakdown>,
}

struct Accumulator {
    window_start: DateTime<Utc>,
    success: u64,
    failure: u64,
    latency_sum: f64,
    latency_count: u64,
    min_latency: Option<f64>,
    max_latency: Option<f64>,
    http: Option<HttpBreakdown>,
}

impl Accumulator {
    fn new(window_start: DateTime<Utc>, fine_grained: bool) -> Self {
        Self {
            window_start,
            success: 0,
            failure: 0,
            latency_sum: 0.0,
            latency_count: 0,
            min_latency: None,
            max_latency: None,
            http: fine_grained.then(HttpBreakdown::default),
        }
    }

    fn add(&mut self, result: &RawResult, fine_grained: bool) {
        let class = classify(result, fine_grained);

        if class.success {
            self.success += 1;
        }
        if class.failure {
            self.failure += 1;
        }
        if let Some(http) = self.http.as_mut() {
            http.timeout_count += class.timeout as u64;
            http.count_2xx += class.class_2xx as u64;
            http.count_4xx += class.class_4xx as u64;
            http.count_5xx += class.class_5xx as u64;
        }

        if let Some(latency) = result.latency_ms() {
            self.latency_sum += latency;
            self.latency_count += 1;
            self.min_latency = Some(self.min_latency.map_or(latency, |m| m.min(latency)));
            self.max_latency = Some(self.max_latency.map_or(latency, |m| m.max(latency)));
        }
    }

    fn finish(self) -> Bucket {
        let avg = if self.latency_count > 0 {
            self.latency_sum / self.latency_count as f64
        } else {
            0.0
        };

        Bucket {
            window_start: self.window_start,
            success_count: self.success,
            failure_count: self.failure,
            avg_latency_ms: avg,
            min_latency_ms: self.min_latency.unwrap_or(0.0),
            max_latency_ms: self.max_latency.unwrap_or(0.0),
            http: self.http,
        }
    }
}

/// Aggregate `results` into `spec.count` buckets ending one window before now.
pub fn aggregate(results: &[RawResult], fine_grained: bool, spec: &WindowSpec) -> Vec<Bucket> {
    aggregate_at(results, fine_grained, spec, Utc::now())
}

/// Aggregate relative to an explicit `now`.
///
/// Always returns exactly `spec.count` buckets in ascending order. Results
/// whose window falls outside the generated range are ignored.
pub fn aggregate_at(
    results: &[RawResult],
    fine_grained: bool,
    spec: &WindowSpec,
    now: DateTime<Utc>,
) -> Vec<Bucket> {
    let width = spec.width_secs();
    let mut buckets: Vec<Accumulator> = spec
        .window_starts(now)
        .into_iter()
        .map(|start| Accumulator::new(start, fine_grained))
        .collect();

    let Some(first) = buckets.first().map(|b| b.window_start.timestamp()) else {
        return Vec::new();
    };

    let mut dropped = 0usize;
    for result in results {
        let key = truncate_to_window(result.timestamp, width).timestamp();
        let offset = key - first;
        if offset < 0 {
            dropped += 1;
            continue;
        }

        match buckets.get_mut((offset / width) as usize) {
            Some(bucket) => bucket.add(result, fine_grained),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::trace!("aggregate: {} of {} results outside window range", dropped, results.len());
    }

    buckets.into_iter().map(Accumulator::finish).collect()
}

/// Truncate a datetime to the start of its containing window.
pub fn truncate_to_window(dt: DateTime<Utc>, window_seconds: i64) -> DateTime<Utc> {
    let ts = dt.timestamp();
    let truncated = ts - ts.rem_euclid(window_seconds.max(1));
    DateTime::from_timestamp(truncated, 0).unwrap_or(dt)
}
