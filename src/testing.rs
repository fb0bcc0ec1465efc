//! Test doubles shared by the module tests.

use crate::api::{
    ApiError, Check, CheckId, CheckKind, CheckStats, DashboardApi, Domain, DomainId,
    IntervalPeriod, IntervalPoint, NewCheck, RawResult, ResultsQuery, TimeRange,
};
use crate::view::{ChartData, ChartHandle, ChartKey, ChartRenderer, RenderError};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

pub(crate) fn check(id: CheckId, domain_id: DomainId, kind: &str) -> Check {
    Check {
        id,
        domain_id,
        kind: CheckKind::from(kind.to_string()),
        enabled: true,
        interval_seconds: 60,
        params: None,
        realtime_mode: false,
        rate_limit_per_minute: 0,
    }
}

pub(crate) fn domain(id: DomainId, name: &str) -> Domain {
    Domain {
        id,
        name: name.to_string(),
    }
}

#[derive(Default)]
struct MockState {
    domains: Vec<Domain>,
    checks: HashMap<DomainId, Vec<Check>>,
    results: HashMap<CheckId, Vec<RawResult>>,
    stats: HashMap<CheckId, CheckStats>,
    intervals: HashMap<CheckId, Vec<IntervalPoint>>,
    failing_results: HashSet<CheckId>,
    failing_checks: HashSet<DomainId>,
    malformed_domains: bool,
    next_id: i64,
    list_domains_calls: usize,
    list_checks_calls: HashMap<DomainId, usize>,
    results_queries: Vec<(CheckId, ResultsQuery)>,
    intervals_calls: Vec<(CheckId, IntervalPeriod, TimeRange)>,
    mutations: usize,
}

/// In-memory backend with call counters and scripted failures.
pub(crate) struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn add_domain(&self, id: DomainId, name: &str) {
        let mut state = self.lock();
        state.domains.push(domain(id, name));
        state.checks.entry(id).or_default();
    }

    pub fn add_check(&self, check: Check) {
        self.lock().checks.entry(check.domain_id).or_default().push(check);
    }

    pub fn set_results(&self, check_id: CheckId, results: Vec<RawResult>) {
        self.lock().results.insert(check_id, results);
    }

    pub fn set_stats(&self, check_id: CheckId, stats: CheckStats) {
        self.lock().stats.insert(check_id, stats);
    }

    pub fn set_intervals(&self, check_id: CheckId, points: Vec<IntervalPoint>) {
        self.lock().intervals.insert(check_id, points);
    }

    pub fn fail_results(&self, check_id: CheckId) {
        self.lock().failing_results.insert(check_id);
    }

    pub fn fail_checks(&self, domain_id: DomainId) {
        self.lock().failing_checks.insert(domain_id);
    }

    pub fn set_malformed_domains(&self, malformed: bool) {
        self.lock().malformed_domains = malformed;
    }

    /// Remove a domain behind the dashboard's back.
    pub fn drop_domain(&self, domain_id: DomainId) {
        let mut state = self.lock();
        state.domains.retain(|d| d.id != domain_id);
        state.checks.remove(&domain_id);
    }

    /// Change a check behind the dashboard's back.
    pub fn edit_check(&self, check_id: CheckId, edit: impl FnOnce(&mut Check)) {
        let mut state = self.lock();
        if let Some(check) = state
            .checks
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|c| c.id == check_id)
        {
            edit(check);
        }
    }

    pub fn list_domains_calls(&self) -> usize {
        self.lock().list_domains_calls
    }

    pub fn list_checks_calls(&self, domain_id: DomainId) -> usize {
        self.lock().list_checks_calls.get(&domain_id).copied().unwrap_or(0)
    }

    pub fn results_calls(&self) -> usize {
        self.lock().results_queries.len()
    }

    pub fn results_queries(&self) -> Vec<(CheckId, ResultsQuery)> {
        self.lock().results_queries.clone()
    }

    pub fn intervals_calls(&self) -> Vec<(CheckId, IntervalPeriod, TimeRange)> {
        self.lock().intervals_calls.clone()
    }

    pub fn mutation_calls(&self) -> usize {
        self.lock().mutations
    }
}

fn not_found(what: &str, id: i64) -> ApiError {
    ApiError::Status {
        status: 404,
        body: format!("{} {} not found", what, id),
    }
}

#[async_trait]
impl DashboardApi for MockApi {
    async fn list_domains(&self) -> Result<Vec<Domain>, ApiError> {
        let mut state = self.lock();
        state.list_domains_calls += 1;
        if state.malformed_domains {
            return Err(ApiError::Decode {
                endpoint: "/domains".to_string(),
                reason: "invalid type: map, expected a sequence".to_string(),
            });
        }
        Ok(state.domains.clone())
    }

    async fn list_checks(&self, domain_id: DomainId) -> Result<Vec<Check>, ApiError> {
        let mut state = self.lock();
        *state.list_checks_calls.entry(domain_id).or_default() += 1;
        if state.failing_checks.contains(&domain_id) {
            return Err(ApiError::Status {
                status: 500,
                body: "checks unavailable".to_string(),
            });
        }
        state
            .checks
            .get(&domain_id)
            .cloned()
            .ok_or_else(|| not_found("domain", domain_id))
    }

    async fn check_results(
        &self,
        check_id: CheckId,
        query: &ResultsQuery,
    ) -> Result<Vec<RawResult>, ApiError> {
        let mut state = self.lock();
        state.results_queries.push((check_id, *query));
        if state.failing_results.contains(&check_id) {
            return Err(ApiError::Status {
                status: 503,
                body: "results unavailable".to_string(),
            });
        }
        Ok(state
            .results
            .get(&check_id)
            .map(|results| {
                results
                    .iter()
                    .filter(|r| match &query.range {
                        Some(range) => r.timestamp >= range.from && r.timestamp < range.to,
                        None => true,
                    })
                    .take(query.page_size as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn check_stats(&self, check_id: CheckId) -> Result<CheckStats, ApiError> {
        self.lock()
            .stats
            .get(&check_id)
            .cloned()
            .ok_or_else(|| not_found("stats for check", check_id))
    }

    async fn check_intervals(
        &self,
        check_id: CheckId,
        period: IntervalPeriod,
        range: TimeRange,
    ) -> Result<Vec<IntervalPoint>, ApiError> {
        let mut state = self.lock();
        state.intervals_calls.push((check_id, period, range));
        Ok(state.intervals.get(&check_id).cloned().unwrap_or_default())
    }

    async fn create_domain(&self, name: &str) -> Result<Domain, ApiError> {
        let mut state = self.lock();
        state.mutations += 1;
        state.next_id += 1;
        let created = domain(state.next_id, name);
        state.domains.push(created.clone());
        state.checks.insert(created.id, Vec::new());
        Ok(created)
    }

    async fn delete_domain(&self, domain_id: DomainId) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.mutations += 1;
        let before = state.domains.len();
        state.domains.retain(|d| d.id != domain_id);
        if state.domains.len() == before {
            return Err(not_found("domain", domain_id));
        }
        state.checks.remove(&domain_id);
        Ok(())
    }

    async fn create_check(&self, domain_id: DomainId, new: &NewCheck) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.mutations += 1;
        state.next_id += 1;
        let id = state.next_id;
        let list = state
            .checks
            .get_mut(&domain_id)
            .ok_or_else(|| not_found("domain", domain_id))?;
        list.push(Check {
            id,
            domain_id,
            kind: new.kind,
            enabled: true,
            interval_seconds: new.interval_seconds,
            params: Some(new.params.clone()),
            realtime_mode: new.realtime_mode,
            rate_limit_per_minute: new.rate_limit_per_minute,
        });
        Ok(())
    }

    async fn update_check(&self, check_id: CheckId, new: &NewCheck) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.mutations += 1;
        let check = state
            .checks
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|c| c.id == check_id)
            .ok_or_else(|| not_found("check", check_id))?;
        check.kind = new.kind;
        check.interval_seconds = new.interval_seconds;
        check.params = Some(new.params.clone());
        check.realtime_mode = new.realtime_mode;
        check.rate_limit_per_minute = new.rate_limit_per_minute;
        Ok(())
    }

    async fn delete_check(&self, check_id: CheckId) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.mutations += 1;
        let mut found = false;
        for list in state.checks.values_mut() {
            let before = list.len();
            list.retain(|c| c.id != check_id);
            found |= list.len() != before;
        }
        if found {
            Ok(())
        } else {
            Err(not_found("check", check_id))
        }
    }

    async fn set_check_enabled(&self, check_id: CheckId, enabled: bool) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.mutations += 1;
        let check = state
            .checks
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|c| c.id == check_id)
            .ok_or_else(|| not_found("check", check_id))?;
        check.enabled = enabled;
        Ok(())
    }
}

#[derive(Default)]
struct RecorderState {
    next_handle: u64,
    owners: HashMap<ChartHandle, ChartKey>,
    live: HashSet<ChartHandle>,
    disposed_handles: HashSet<ChartHandle>,
    latest: HashMap<ChartKey, ChartData>,
    created: usize,
    updated: usize,
    disposed: usize,
    double_disposed: usize,
    created_by_key: HashMap<ChartKey, usize>,
    disposed_by_key: HashMap<ChartKey, usize>,
}

/// Renderer that records every lifecycle call.
pub(crate) struct RecordingRenderer {
    ready: bool,
    state: Mutex<RecorderState>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            ready: true,
            state: Mutex::new(RecorderState::default()),
        }
    }

    /// A renderer whose surfaces never become ready.
    pub fn never_ready() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap()
    }

    pub fn created(&self) -> usize {
        self.lock().created
    }

    pub fn updated(&self) -> usize {
        self.lock().updated
    }

    pub fn disposed(&self) -> usize {
        self.lock().disposed
    }

    /// Handles created and not yet disposed or lost.
    pub fn live(&self) -> usize {
        self.lock().live.len()
    }

    pub fn no_double_dispose(&self) -> bool {
        self.lock().double_disposed == 0
    }

    pub fn created_for(&self, key: ChartKey) -> usize {
        self.lock().created_by_key.get(&key).copied().unwrap_or(0)
    }

    pub fn disposed_for(&self, key: ChartKey) -> usize {
        self.lock().disposed_by_key.get(&key).copied().unwrap_or(0)
    }

    pub fn latest(&self, key: ChartKey) -> Option<ChartData> {
        self.lock().latest.get(&key).cloned()
    }

    /// Forget the live chart for `key` as if its surface were torn down externally.
    pub fn drop_surface(&self, key: ChartKey) {
        let mut state = self.lock();
        let handles: Vec<_> = state
            .owners
            .iter()
            .filter(|(_, k)| **k == key)
            .map(|(h, _)| *h)
            .collect();
        for handle in handles {
            state.live.remove(&handle);
        }
    }
}

#[async_trait]
impl ChartRenderer for RecordingRenderer {
    async fn surface_ready(&self, _key: ChartKey) -> bool {
        if !self.ready {
            std::future::pending::<()>().await;
        }
        true
    }

    fn create(&self, key: ChartKey, data: &ChartData) -> Result<ChartHandle, RenderError> {
        let mut state = self.lock();
        state.next_handle += 1;
        let handle = ChartHandle(state.next_handle);
        state.owners.insert(handle, key);
        state.live.insert(handle);
        state.latest.insert(key, data.clone());
        state.created += 1;
        *state.created_by_key.entry(key).or_default() += 1;
        Ok(handle)
    }

    fn update(&self, handle: ChartHandle, data: &ChartData) -> Result<(), RenderError> {
        let mut state = self.lock();
        if !state.live.contains(&handle) {
            return Err(RenderError::StaleHandle(handle));
        }
        if let Some(key) = state.owners.get(&handle).copied() {
            state.latest.insert(key, data.clone());
        }
        state.updated += 1;
        Ok(())
    }

    fn dispose(&self, handle: ChartHandle) {
        let mut state = self.lock();
        if !state.disposed_handles.insert(handle) {
            state.double_disposed += 1;
            return;
        }
        state.live.remove(&handle);
        state.disposed += 1;
        if let Some(key) = state.owners.get(&handle).copied() {
            *state.disposed_by_key.entry(key).or_default() += 1;
        }
    }
}
