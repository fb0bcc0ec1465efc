//! Per-check detail view.
//!
//! Shows backend statistics, the most recent results, a per-check window
//! chart and the backend's pre-aggregated interval series. At most one
//! detail view is open at a time.

use super::{Dashboard, DashboardError};
use crate::aggregate::aggregate_at;
use crate::api::{Check, CheckId, CheckStats, IntervalPeriod, RawResult};
use crate::view::{bucket_series, interval_series, ChartKey};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of recent results listed in the detail view.
pub const RECENT_RESULTS_LIMIT: u32 = 50;

/// Headline numbers of a check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    /// Percentage of successful results.
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub total_results: u64,
}

impl From<&CheckStats> for StatsSummary {
    fn from(stats: &CheckStats) -> Self {
        Self {
            success_rate: stats.success_rate(),
            avg_latency_ms: stats.latency_stats.avg,
            p95_latency_ms: stats.latency_stats.p95,
            total_results: stats.total_results,
        }
    }
}

/// State of the open detail view.
#[derive(Debug, Clone, Serialize)]
pub struct CheckDetail {
    pub check: Check,
    pub period: IntervalPeriod,
    pub stats: Option<StatsSummary>,
    pub recent: Vec<RawResult>,
    pub window_chart: ChartKey,
    pub interval_chart: ChartKey,
    /// Messages of the parts that failed to load on the last refresh.
    pub errors: Vec<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CheckDetail {
    fn new(check: Check, period: IntervalPeriod) -> Self {
        Self {
            window_chart: ChartKey::Check(check.id),
            interval_chart: ChartKey::Intervals(check.id),
            check,
            period,
            stats: None,
            recent: Vec::new(),
            errors: Vec::new(),
            loaded_at: None,
        }
    }
}

impl Dashboard {
    pub fn detail(&self) -> Option<&CheckDetail> {
        self.detail.as_ref()
    }

    /// Open the detail view of `check_id`, replacing any open one.
    pub async fn open_check_detail(
        &mut self,
        check_id: CheckId,
        period: IntervalPeriod,
    ) -> Result<&CheckDetail, DashboardError> {
        let check = self.find_check(check_id).await?;

        if self.detail.is_some() {
            self.close_check_detail();
        }

        tracing::debug!("Opening detail for check {} ({})", check_id, period.as_str());
        let detail = CheckDetail::new(check, period);
        self.bindings.attach(detail.window_chart);
        self.bindings.attach(detail.interval_chart);
        self.detail = Some(detail);

        self.refresh_detail(Utc::now()).await;
        self.detail.as_ref().ok_or(DashboardError::NoDetailOpen)
    }

    /// Switch the interval period of the open detail view.
    pub async fn set_detail_period(&mut self, period: IntervalPeriod) -> Result<&CheckDetail, DashboardError> {
        let detail = self.detail.as_mut().ok_or(DashboardError::NoDetailOpen)?;
        detail.period = period;

        self.refresh_detail(Utc::now()).await;
        self.detail.as_ref().ok_or(DashboardError::NoDetailOpen)
    }

    /// Close the detail view and dispose both of its charts.
    pub fn close_check_detail(&mut self) {
        if let Some(detail) = self.detail.take() {
            self.bindings.detach(detail.window_chart);
            self.bindings.detach(detail.interval_chart);
            tracing::debug!("Closed detail for check {}", detail.check.id);
        }
    }

    /// Reload everything shown in the open detail view. All parts are
    /// fetched concurrently; a part that fails keeps its previous content.
    pub(super) async fn refresh_detail(&mut self, now: DateTime<Utc>) {
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        let mut check = detail.check.clone();
        if let Some(current) = self.cached_check(check.id) {
            check = current;
        }
        let period = detail.period;

        let api = self.fetch.api();
        let range = self.windows.range(now);
        let (stats, recent, window_results, intervals) = tokio::join!(
            api.check_stats(check.id),
            self.fetch.recent_results(check.id, RECENT_RESULTS_LIMIT),
            self.fetch.fetch_results(std::slice::from_ref(&check), range),
            api.check_intervals(check.id, period, period.range_ending(now)),
        );

        let fine_grained = check.kind.is_fine_grained();
        let buckets = aggregate_at(&window_results, fine_grained, &self.windows, now);
        let window_data = bucket_series(&buckets, fine_grained);

        let mut errors = Vec::new();
        let interval_data = match intervals {
            Ok(points) => Some(interval_series(&points, period)),
            Err(e) => {
                tracing::warn!("Failed to load intervals for check {}: {}", check.id, e);
                errors.push(format!("intervals: {}", e));
                None
            }
        };

        let check_key = ChartKey::Check(check.id);
        if let Err(e) = self.bindings.bind(check_key, &window_data).await {
            tracing::warn!("Failed to render chart {}: {}", check_key, e);
        }
        if let Some(data) = interval_data {
            let key = ChartKey::Intervals(check.id);
            if let Err(e) = self.bindings.bind(key, &data).await {
                tracing::warn!("Failed to render chart {}: {}", key, e);
            }
        }

        let Some(detail) = self.detail.as_mut() else {
            return;
        };
        match stats {
            Ok(stats) => detail.stats = Some(StatsSummary::from(&stats)),
            Err(e) => {
                tracing::warn!("Failed to load stats for check {}: {}", check.id, e);
                errors.push(format!("stats: {}", e));
            }
        }
        match recent {
            Ok(recent) => detail.recent = recent,
            Err(e) => {
                tracing::warn!("Failed to load recent results for check {}: {}", check.id, e);
                errors.push(format!("results: {}", e));
            }
        }
        detail.check = check;
        detail.errors = errors;
        detail.loaded_at = Some(now);
    }
}
