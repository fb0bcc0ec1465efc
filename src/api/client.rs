//! reqwest implementation of the backend API.

use super::{
    ApiError, Check, CheckId, CheckStats, DashboardApi, Domain, DomainId, IntervalPeriod,
    IntervalPoint, IntervalsPage, NewCheck, RawResult, ResultsPage, ResultsQuery, TimeRange,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client for the DomainPulse backend.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: String,
}

impl HttpApi {
    /// Create a client for the backend at `base` (e.g. `http://localhost:8080`).
    pub fn new(base: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        tracing::debug!("GET {}", path);
        let response = self.client.get(self.url(path)).query(query).send().await?;
        let bytes = read_success_body(response).await?;
        decode(path, &bytes)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError> {
        tracing::debug!("{} {}", method, path);
        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        read_success_body(response).await
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

/// Decode a response body, naming the endpoint on failure.
pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

fn results_query_pairs(query: &ResultsQuery) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::with_capacity(4);
    if let Some(range) = &query.range {
        pairs.extend(range.query_pairs());
    }
    pairs.push(("page", query.page.max(1).to_string()));
    pairs.push(("page_size", query.page_size.max(1).to_string()));
    pairs
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn list_domains(&self) -> Result<Vec<Domain>, ApiError> {
        self.get_json("/domains", &[]).await
    }

    async fn list_checks(&self, domain_id: DomainId) -> Result<Vec<Check>, ApiError> {
        self.get_json(&format!("/domains/{}/checks", domain_id), &[]).await
    }

    async fn check_results(
        &self,
        check_id: CheckId,
        query: &ResultsQuery,
    ) -> Result<Vec<RawResult>, ApiError> {
        let page: ResultsPage = self
            .get_json(
                &format!("/checks/{}/results", check_id),
                &results_query_pairs(query),
            )
            .await?;
        Ok(page.into_results())
    }

    async fn check_stats(&self, check_id: CheckId) -> Result<CheckStats, ApiError> {
        self.get_json(&format!("/checks/{}/stats", check_id), &[]).await
    }

    async fn check_intervals(
        &self,
        check_id: CheckId,
        period: IntervalPeriod,
        range: TimeRange,
    ) -> Result<Vec<IntervalPoint>, ApiError> {
        let mut pairs = vec![("interval", period.as_str().to_string())];
        pairs.extend(range.query_pairs());
        pairs.push(("page", "1".to_string()));
        pairs.push(("page_size", "100".to_string()));

        let page: IntervalsPage = self
            .get_json(&format!("/checks/{}/intervals", check_id), &pairs)
            .await?;
        Ok(page.data)
    }

    async fn create_domain(&self, name: &str) -> Result<Domain, ApiError> {
        #[derive(Serialize)]
        struct Body<'a> {
            name: &'a str,
        }

        let bytes = self
            .send(reqwest::Method::POST, "/domains", Some(&Body { name }))
            .await?;
        decode("/domains", &bytes)
    }

    async fn delete_domain(&self, domain_id: DomainId) -> Result<(), ApiError> {
        self.send::<()>(reqwest::Method::DELETE, &format!("/domains/{}", domain_id), None)
            .await
            .map(|_| ())
    }

    async fn create_check(&self, domain_id: DomainId, check: &NewCheck) -> Result<(), ApiError> {
        self.send(
            reqwest::Method::POST,
            &format!("/domains/{}/checks", domain_id),
            Some(check),
        )
        .await
        .map(|_| ())
    }

    async fn update_check(&self, check_id: CheckId, check: &NewCheck) -> Result<(), ApiError> {
        self.send(reqwest::Method::PUT, &format!("/checks/{}", check_id), Some(check))
            .await
            .map(|_| ())
    }

    async fn delete_check(&self, check_id: CheckId) -> Result<(), ApiError> {
        self.send::<()>(reqwest::Method::DELETE, &format!("/checks/{}", check_id), None)
            .await
            .map(|_| ())
    }

    async fn set_check_enabled(&self, check_id: CheckId, enabled: bool) -> Result<(), ApiError> {
        let action = if enabled { "enable" } else { "disable" };
        self.send::<()>(
            reqwest::Method::POST,
            &format!("/checks/{}/{}", check_id, action),
            None,
        )
        .await
        .map(|_| ())
    }
}
