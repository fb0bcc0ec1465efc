//! Dashboard state and operations.
//!
//! `Dashboard` owns the entity cache, the chart bindings and the rendered
//! lists. One synchronization pass brings all of them in line with the
//! backend; every user action ends with such a pass.

mod detail;
mod validate;

pub use detail::*;
pub use validate::*;

use crate::aggregate::{aggregate_at, WindowSpec};
use crate::api::{ApiError, Check, CheckId, DashboardApi, Domain, DomainId};
use crate::cache::EntityCache;
use crate::fetch::{FetchOrchestrator, DEFAULT_PAGE_SIZE};
use crate::view::{
    bucket_series, BindOutcome, BindingTable, ChartKey, ChartRenderer, CheckElement,
    DomainElement, ElementList, ListState, RenderError,
};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Dashboard error types.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("unknown check {0}")]
    UnknownCheck(CheckId),
    #[error("unknown domain {0}")]
    UnknownDomain(DomainId),
    #[error("no check detail is open")]
    NoDetailOpen,
}

/// Tunables for a dashboard instance.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub windows: WindowSpec,
    pub page_size: u32,
    pub surface_ready_timeout: Duration,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            windows: WindowSpec::default(),
            page_size: DEFAULT_PAGE_SIZE,
            surface_ready_timeout: Duration::from_millis(500),
        }
    }
}

/// What a synchronization pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub domains: usize,
    pub checks: usize,
    pub charts_bound: usize,
    pub failed_listings: usize,
}

/// Serializable view of one domain row.
#[derive(Debug, Clone, Serialize)]
pub struct DomainView {
    #[serde(flatten)]
    pub domain: DomainElement,
    pub chart: ChartKey,
    pub checks_state: ListState,
    pub checks: Vec<CheckElement>,
}

/// Serializable view of the whole dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub domains_state: ListState,
    pub domains: Vec<DomainView>,
    pub detail: Option<CheckDetail>,
    pub last_sync: Option<DateTime<Utc>>,
}

pub struct Dashboard {
    fetch: FetchOrchestrator,
    cache: EntityCache,
    bindings: BindingTable,
    domains: ElementList<DomainElement>,
    checks: HashMap<DomainId, ElementList<CheckElement>>,
    detail: Option<CheckDetail>,
    windows: WindowSpec,
    last_sync: Option<DateTime<Utc>>,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        renderer: Arc<dyn ChartRenderer>,
        options: DashboardOptions,
    ) -> Self {
        Self {
            fetch: FetchOrchestrator::new(api, options.page_size),
            cache: EntityCache::new(),
            bindings: BindingTable::new(renderer, options.surface_ready_timeout),
            domains: ElementList::new(),
            checks: HashMap::new(),
            detail: None,
            windows: options.windows,
            last_sync: None,
        }
    }

    fn api(&self) -> &Arc<dyn DashboardApi> {
        self.fetch.api()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Run a full synchronization pass.
    pub async fn sync(&mut self) -> Result<SyncSummary, DashboardError> {
        self.sync_at(Utc::now()).await
    }

    /// Run a full synchronization pass with charts anchored at `now`.
    ///
    /// A failed domain listing is shown inline on the domain list and ends
    /// the pass. Failed check listings are shown inline on their domain.
    pub async fn sync_at(&mut self, now: DateTime<Utc>) -> Result<SyncSummary, DashboardError> {
        let domains = match self.api().list_domains().await {
            Ok(domains) => domains,
            Err(e) => {
                tracing::warn!("Failed to list domains: {}", e);
                self.domains.fail(e.to_string());
                return Err(e.into());
            }
        };

        self.reconcile_domains(&domains);

        let domain_ids = self.domains.keys();
        let mut listings = self.fetch.list_checks_for(&domain_ids, &mut self.cache).await;

        let mut summary = SyncSummary {
            domains: domain_ids.len(),
            ..Default::default()
        };
        let mut removed_checks = Vec::new();
        let mut jobs: Vec<(DomainId, Vec<Check>)> = Vec::with_capacity(domain_ids.len());

        for domain_id in &domain_ids {
            let list = self.checks.entry(*domain_id).or_default();
            match listings.remove(domain_id) {
                Some(Ok(checks)) => {
                    let report = list.reconcile(&checks, |_| {});
                    removed_checks.extend(report.removed);
                    summary.checks += checks.len();
                    jobs.push((*domain_id, checks));
                }
                Some(Err(e)) => {
                    list.fail(e.to_string());
                    summary.failed_listings += 1;
                }
                None => {}
            }
        }

        if let Some(open) = self.detail.as_ref().map(|d| d.check.id) {
            if removed_checks.contains(&open) {
                tracing::info!("Check {} is gone, closing its detail view", open);
                self.close_check_detail();
            }
        }

        let range = self.windows.range(now);
        let fetch = &self.fetch;
        let fetched = join_all(jobs.iter().map(|(domain_id, checks)| async move {
            (*domain_id, fetch.fetch_results(checks, range).await)
        }))
        .await;

        for (domain_id, results) in fetched {
            // The element may have been removed while its fetch was in flight
            if !self.domains.contains(domain_id) {
                continue;
            }
            let buckets = aggregate_at(&results, false, &self.windows, now);
            match self
                .bindings
                .bind(ChartKey::Domain(domain_id), &bucket_series(&buckets, false))
                .await
            {
                Ok(BindOutcome::Skipped) => {}
                Ok(_) => summary.charts_bound += 1,
                Err(e) => tracing::warn!("Failed to render chart for domain {}: {}", domain_id, e),
            }
        }

        if self.detail.is_some() {
            self.refresh_detail(now).await;
        }

        self.last_sync = Some(now);
        tracing::debug!(
            "Synchronized {} domains, {} checks, {} charts",
            summary.domains,
            summary.checks,
            summary.charts_bound
        );
        Ok(summary)
    }

    fn reconcile_domains(&mut self, domains: &[Domain]) {
        let current: HashSet<DomainId> = self.domains.keys().into_iter().collect();
        let incoming: HashSet<DomainId> = domains.iter().map(|d| d.id).collect();
        if current != incoming {
            self.cache.invalidate_all();
        }

        let bindings = &mut self.bindings;
        let report = self
            .domains
            .reconcile(domains, |id| bindings.detach(ChartKey::Domain(id)));

        for id in &report.removed {
            self.forget_domain(*id);
        }
        for id in self.domains.keys() {
            self.bindings.attach(ChartKey::Domain(id));
        }
    }

    /// Drop everything hanging off a domain whose element is already gone.
    fn forget_domain(&mut self, domain_id: DomainId) {
        self.checks.remove(&domain_id);
        self.cache.invalidate(domain_id);
        if self.detail.as_ref().is_some_and(|d| d.check.domain_id == domain_id) {
            self.close_check_detail();
        }
    }

    /// Run a pass after a user action. The action already succeeded, so a
    /// failed pass is only logged; it is visible inline in the view.
    async fn resync(&mut self, action: &str) {
        if let Err(e) = self.sync().await {
            tracing::warn!("Refresh after {} failed: {}", action, e);
        }
    }

    pub async fn add_domain(&mut self, name: &str) -> Result<Domain, DashboardError> {
        let name = validate_domain_name(name)?;
        let domain = self.api().create_domain(&name).await?;
        tracing::info!("Added domain {} ({})", domain.name, domain.id);

        self.cache.invalidate_all();
        self.resync("adding a domain").await;
        Ok(domain)
    }

    pub async fn delete_domain(&mut self, domain_id: DomainId) -> Result<(), DashboardError> {
        self.api().delete_domain(domain_id).await?;
        tracing::info!("Deleted domain {}", domain_id);

        let bindings = &mut self.bindings;
        if self
            .domains
            .remove(domain_id, |id| bindings.detach(ChartKey::Domain(id)))
            .is_some()
        {
            self.forget_domain(domain_id);
        }
        self.cache.invalidate_all();

        self.resync("deleting a domain").await;
        Ok(())
    }

    pub async fn add_check(&mut self, domain_id: DomainId, form: &CheckForm) -> Result<(), DashboardError> {
        let new_check = form.validate()?;
        if !self.domains.contains(domain_id) {
            return Err(DashboardError::UnknownDomain(domain_id));
        }

        self.api().create_check(domain_id, &new_check).await?;
        tracing::info!("Added {} check to domain {}", new_check.kind, domain_id);

        self.cache.invalidate(domain_id);
        self.resync("adding a check").await;
        Ok(())
    }

    /// Replace a check's settings. The form is validated before anything is
    /// sent, and the owning domain's listing is re-fetched afterwards.
    pub async fn update_check(&mut self, check_id: CheckId, form: &CheckForm) -> Result<(), DashboardError> {
        let new_check = form.validate()?;

        self.api().update_check(check_id, &new_check).await?;
        tracing::info!("Updated check {} ({})", check_id, new_check.kind);

        self.invalidate_owner_of(check_id);
        self.resync("editing a check").await;
        Ok(())
    }

    pub async fn delete_check(&mut self, check_id: CheckId) -> Result<(), DashboardError> {
        self.api().delete_check(check_id).await?;
        tracing::info!("Deleted check {}", check_id);

        if self.detail.as_ref().is_some_and(|d| d.check.id == check_id) {
            self.close_check_detail();
        }
        self.invalidate_owner_of(check_id);
        self.resync("deleting a check").await;
        Ok(())
    }

    pub async fn set_check_enabled(&mut self, check_id: CheckId, enabled: bool) -> Result<(), DashboardError> {
        self.api().set_check_enabled(check_id, enabled).await?;
        tracing::info!(
            "{} check {}",
            if enabled { "Enabled" } else { "Disabled" },
            check_id
        );

        self.invalidate_owner_of(check_id);
        self.resync("toggling a check").await;
        Ok(())
    }

    fn invalidate_owner_of(&mut self, check_id: CheckId) {
        match self.cache.owner_of(check_id) {
            Some(domain_id) => self.cache.invalidate(domain_id),
            None => self.cache.invalidate_all(),
        }
    }

    /// Current check record, refilling the cache once if it is not there.
    async fn find_check(&mut self, check_id: CheckId) -> Result<Check, DashboardError> {
        if let Some(check) = self.cached_check(check_id) {
            return Ok(check);
        }

        let domain_ids = self.domains.keys();
        self.fetch.list_checks_for(&domain_ids, &mut self.cache).await;
        self.cached_check(check_id)
            .ok_or(DashboardError::UnknownCheck(check_id))
    }

    fn cached_check(&self, check_id: CheckId) -> Option<Check> {
        let domain_id = self.cache.owner_of(check_id)?;
        self.cache
            .get(domain_id)?
            .iter()
            .find(|c| c.id == check_id)
            .cloned()
    }

    pub fn snapshot(&self) -> DashboardView {
        let domains = self
            .domains
            .iter()
            .map(|domain| {
                let (checks_state, checks) = match self.checks.get(&domain.id) {
                    Some(list) => (list.state().clone(), list.iter().cloned().collect()),
                    None => (ListState::Loading, Vec::new()),
                };
                DomainView {
                    domain: domain.clone(),
                    chart: ChartKey::Domain(domain.id),
                    checks_state,
                    checks,
                }
            })
            .collect();

        DashboardView {
            domains_state: self.domains.state().clone(),
            domains,
            detail: self.detail.clone(),
            last_sync: self.last_sync,
        }
    }
}
