//! Conversion of aggregated data into chart series.

use super::{Axis, ChartData, Series};
use crate::aggregate::{Bucket, HttpBreakdown};
use crate::api::{IntervalPeriod, IntervalPoint};

fn series(label: &str, axis: Axis, values: Vec<f64>) -> Series {
    Series {
        label: label.to_string(),
        axis,
        values,
    }
}

/// Chart data for window buckets.
///
/// HTTP charts split counts by response class; everything else shows
/// success and failure counts. Both carry average latency on the second axis.
pub fn bucket_series(buckets: &[Bucket], fine_grained: bool) -> ChartData {
    let labels = buckets
        .iter()
        .map(|b| b.window_start.format("%H:%M").to_string())
        .collect();

    let latency = series(
        "Latency (ms)",
        Axis::Latency,
        buckets.iter().map(|b| b.avg_latency_ms).collect(),
    );

    let series = if fine_grained {
        let http = |f: fn(&HttpBreakdown) -> u64| -> Vec<f64> {
            buckets
                .iter()
                .map(|b| b.http.as_ref().map(f).unwrap_or(0) as f64)
                .collect()
        };
        vec![
            series("2xx", Axis::Count, http(|h| h.count_2xx)),
            series("4xx", Axis::Count, http(|h| h.count_4xx)),
            series("5xx", Axis::Count, http(|h| h.count_5xx)),
            series("Timeout", Axis::Count, http(|h| h.timeout_count)),
            latency,
        ]
    } else {
        vec![
            series(
                "Success",
                Axis::Count,
                buckets.iter().map(|b| b.success_count as f64).collect(),
            ),
            series(
                "Failure",
                Axis::Count,
                buckets.iter().map(|b| b.failure_count as f64).collect(),
            ),
            latency,
        ]
    };

    ChartData { labels, series }
}

/// Chart data for the backend's pre-aggregated interval series.
pub fn interval_series(points: &[IntervalPoint], period: IntervalPeriod) -> ChartData {
    let format = match period {
        IntervalPeriod::OneHour => "%d.%m %H:%M",
        IntervalPeriod::OneMinute | IntervalPeriod::FiveMinutes => "%H:%M",
    };

    ChartData {
        labels: points
            .iter()
            .map(|p| p.timestamp.format(format).to_string())
            .collect(),
        series: vec![
            series(
                "Success",
                Axis::Count,
                points.iter().map(|p| p.success_count as f64).collect(),
            ),
            series(
                "Failure",
                Axis::Count,
                points.iter().map(|p| p.failure_count as f64).collect(),
            ),
            series(
                "Avg latency (ms)",
                Axis::Latency,
                points.iter().map(|p| p.avg_latency).collect(),
            ),
        ],
    }
}
