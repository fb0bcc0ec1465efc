//! Backend API module.
//!
//! Typed access to the DomainPulse REST backend. Responses are decoded into
//! concrete types at this boundary; a body that does not match is reported as
//! `ApiError::Decode` rather than defaulted deeper in the dashboard.

mod client;
mod models;

pub use client::*;
pub use models::*;

use async_trait::async_trait;
use thiserror::Error;

/// Backend API error types.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// The REST surface the dashboard consumes.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_domains(&self) -> Result<Vec<Domain>, ApiError>;

    async fn list_checks(&self, domain_id: DomainId) -> Result<Vec<Check>, ApiError>;

    async fn check_results(
        &self,
        check_id: CheckId,
        query: &ResultsQuery,
    ) -> Result<Vec<RawResult>, ApiError>;

    async fn check_stats(&self, check_id: CheckId) -> Result<CheckStats, ApiError>;

    async fn check_intervals(
        &self,
        check_id: CheckId,
        period: IntervalPeriod,
        range: TimeRange,
    ) -> Result<Vec<IntervalPoint>, ApiError>;

    async fn create_domain(&self, name: &str) -> Result<Domain, ApiError>;

    async fn delete_domain(&self, domain_id: DomainId) -> Result<(), ApiError>;

    async fn create_check(&self, domain_id: DomainId, check: &NewCheck) -> Result<(), ApiError>;

    async fn update_check(&self, check_id: CheckId, check: &NewCheck) -> Result<(), ApiError>;

    async fn delete_check(&self, check_id: CheckId) -> Result<(), ApiError>;

    async fn set_check_enabled(&self, check_id: CheckId, enabled: bool) -> Result<(), ApiError>;
}
