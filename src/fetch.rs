//! Concurrent fetching of check listings and results.
//!
//! Per-check result failures never abort a refresh: the failing check
//! contributes nothing and the error is logged. Listing failures are
//! returned to the caller, which shows them inline.

use crate::api::{ApiError, Check, CheckId, DashboardApi, DomainId, RawResult, ResultsQuery, TimeRange};
use crate::cache::EntityCache;

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// Results requested per check for the window charts. Only the first page is
/// fetched, so a check logging more than this many results in the chart range
/// is charted from a partial set.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct FetchOrchestrator {
    api: Arc<dyn DashboardApi>,
    page_size: u32,
}

impl FetchOrchestrator {
    pub fn new(api: Arc<dyn DashboardApi>, page_size: u32) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
        }
    }

    pub fn api(&self) -> &Arc<dyn DashboardApi> {
        &self.api
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Whether a results page may have been cut short by the page size.
    pub fn is_full_page(&self, results: &[RawResult]) -> bool {
        results.len() >= self.page_size as usize
    }

    async fn fetch_one(&self, check_id: CheckId, query: &ResultsQuery) -> Vec<RawResult> {
        match self.api.check_results(check_id, query).await {
            Ok(results) => {
                if self.is_full_page(&results) {
                    tracing::debug!(
                        "Check {} filled a page of {} results; later results are not charted",
                        check_id,
                        self.page_size
                    );
                }
                results
            }
            Err(e) => {
                tracing::warn!("Failed to fetch results for check {}: {}", check_id, e);
                Vec::new()
            }
        }
    }

    /// Results of every check in `range`, flattened once all fetches settle.
    pub async fn fetch_results(&self, checks: &[Check], range: TimeRange) -> Vec<RawResult> {
        self.fetch_results_by_check(checks, range)
            .await
            .into_iter()
            .flat_map(|(_, results)| results)
            .collect()
    }

    /// Same fan-out as `fetch_results`, keeping each check's results apart.
    pub async fn fetch_results_by_check(
        &self,
        checks: &[Check],
        range: TimeRange,
    ) -> Vec<(CheckId, Vec<RawResult>)> {
        let query = ResultsQuery::in_range(range, self.page_size);
        let fetches = checks.iter().map(|check| {
            let query = &query;
            async move { (check.id, self.fetch_one(check.id, query).await) }
        });
        join_all(fetches).await
    }

    /// Most recent results of one check, newest first as the backend returns them.
    pub async fn recent_results(&self, check_id: CheckId, limit: u32) -> Result<Vec<RawResult>, ApiError> {
        self.api.check_results(check_id, &ResultsQuery::latest(limit)).await
    }

    /// Check list of `domain_id`, served from `cache` when present.
    pub async fn domain_checks(
        &self,
        cache: &mut EntityCache,
        domain_id: DomainId,
    ) -> Result<Vec<Check>, ApiError> {
        if let Some(checks) = cache.get(domain_id) {
            return Ok(checks.to_vec());
        }

        let checks = self.api.list_checks(domain_id).await?;
        cache.put(domain_id, checks.clone());
        Ok(checks)
    }

    /// Check lists of several domains. Cache misses are fetched concurrently
    /// and stored; a failed listing is reported for its domain only.
    pub async fn list_checks_for(
        &self,
        domain_ids: &[DomainId],
        cache: &mut EntityCache,
    ) -> HashMap<DomainId, Result<Vec<Check>, ApiError>> {
        let mut lists = HashMap::with_capacity(domain_ids.len());
        let mut misses = Vec::new();

        for &domain_id in domain_ids {
            match cache.get(domain_id) {
                Some(checks) => {
                    lists.insert(domain_id, Ok(checks.to_vec()));
                }
                None if !misses.contains(&domain_id) => misses.push(domain_id),
                None => {}
            }
        }

        if !misses.is_empty() {
            tracing::debug!("Fetching check lists for {} domains", misses.len());
        }

        let fetched = join_all(misses.into_iter().map(|domain_id| async move {
            (domain_id, self.api.list_checks(domain_id).await)
        }))
        .await;

        for (domain_id, result) in fetched {
            match result {
                Ok(checks) => {
                    cache.put(domain_id, checks.clone());
                    lists.insert(domain_id, Ok(checks));
                }
                Err(e) => {
                    tracing::warn!("Failed to list checks for domain {}: {}", domain_id, e);
                    lists.insert(domain_id, Err(e));
                }
            }
        }

        lists
    }
}
