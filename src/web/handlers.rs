//! HTTP request handlers.

use super::AppState;
use crate::api::{ApiError, CheckId, DomainId, IntervalPeriod};
use crate::dashboard::{CheckForm, DashboardError};
use crate::view::ChartKey;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

// ============================================================================
// Errors
// ============================================================================

/// HTTP status for a failed dashboard operation.
pub fn status_for(error: &DashboardError) -> StatusCode {
    match error {
        DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
        DashboardError::UnknownCheck(_)
        | DashboardError::UnknownDomain(_)
        | DashboardError::NoDetailOpen => StatusCode::NOT_FOUND,
        DashboardError::Api(ApiError::Status { status: 404, .. }) => StatusCode::NOT_FOUND,
        DashboardError::Api(_) => StatusCode::BAD_GATEWAY,
        DashboardError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: DashboardError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::warn!("Request failed: {}", error);
    }
    (status, error.to_string()).into_response()
}

fn parse_period(raw: Option<&str>) -> Result<IntervalPeriod, Response> {
    match raw {
        None => Ok(IntervalPeriod::default()),
        Some(p) => IntervalPeriod::parse(p)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, "Invalid period (use 1m, 5m or 1h)").into_response()),
    }
}

// ============================================================================
// View
// ============================================================================

pub async fn handle_get_view(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = state.dashboard.lock().await;
    Json(dashboard.snapshot())
}

pub async fn handle_get_charts(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.renderer.charts())
}

pub async fn handle_get_chart(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let key: ChartKey = match key.parse() {
        Ok(k) => k,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };

    match state.renderer.chart(key) {
        Some(chart) => Json(chart).into_response(),
        None => (StatusCode::NOT_FOUND, "Chart not found").into_response(),
    }
}

pub async fn handle_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let result = state
        .coordinator
        .run_exclusive(async {
            let mut dashboard = state.dashboard.lock().await;
            dashboard.sync().await
        })
        .await;

    match result {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// API: Domains
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub name: String,
}

pub async fn handle_create_domain(
    State(state): State<AppState>,
    Json(req): Json<CreateDomainRequest>,
) -> impl IntoResponse {
    let result = state
        .coordinator
        .run_exclusive(async {
            let mut dashboard = state.dashboard.lock().await;
            dashboard.add_domain(&req.name).await
        })
        .await;

    match result {
        Ok(domain) => (StatusCode::CREATED, Json(domain)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_delete_domain(
    State(state): State<AppState>,
    Path(id): Path<DomainId>,
) -> impl IntoResponse {
    let result = state
        .coordinator
        .run_exclusive(async {
            let mut dashboard = state.dashboard.lock().await;
            dashboard.delete_domain(id).await
        })
        .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_create_check(
    State(state): State<AppState>,
    Path(domain_id): Path<DomainId>,
    Json(form): Json<CheckForm>,
) -> impl IntoResponse {
    let result = state
        .coordinator
        .run_exclusive(async {
            let mut dashboard = state.dashboard.lock().await;
            dashboard.add_check(domain_id, &form).await
        })
        .await;

    match result {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// API: Checks
// ============================================================================

pub async fn handle_delete_check(
    State(state): State<AppState>,
    Path(id): Path<CheckId>,
) -> impl IntoResponse {
    let result = state
        .coordinator
        .run_exclusive(async {
            let mut dashboard = state.dashboard.lock().await;
            dashboard.delete_check(id).await
        })
        .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_update_check(
    State(state): State<AppState>,
    Path(id): Path<CheckId>,
    Json(form): Json<CheckForm>,
) -> impl IntoResponse {
    let result = state
        .coordinator
        .run_exclusive(async {
            let mut dashboard = state.dashboard.lock().await;
            dashboard.update_check(id, &form).await
        })
        .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn set_enabled(state: AppState, id: CheckId, enabled: bool) -> Response {
    let result = state
        .coordinator
        .run_exclusive(async {
            let mut dashboard = state.dashboard.lock().await;
            dashboard.set_check_enabled(id, enabled).await
        })
        .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_enable_check(
    State(state): State<AppState>,
    Path(id): Path<CheckId>,
) -> impl IntoResponse {
    set_enabled(state, id, true).await
}

pub async fn handle_disable_check(
    State(state): State<AppState>,
    Path(id): Path<CheckId>,
) -> impl IntoResponse {
    set_enabled(state, id, false).await
}

// ============================================================================
// API: Detail view
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

pub async fn handle_open_detail(
    State(state): State<AppState>,
    Path(id): Path<CheckId>,
    Query(query): Query<PeriodQuery>,
) -> impl IntoResponse {
    let period = match parse_period(query.period.as_deref()) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let mut dashboard = state.dashboard.lock().await;
    match dashboard.open_check_detail(id, period).await {
        Ok(detail) => Json(detail.clone()).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_set_detail_period(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> impl IntoResponse {
    let period = match parse_period(query.period.as_deref()) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let mut dashboard = state.dashboard.lock().await;
    match dashboard.set_detail_period(period).await {
        Ok(detail) => Json(detail.clone()).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_close_detail(State(state): State<AppState>) -> impl IntoResponse {
    state.dashboard.lock().await.close_check_detail();
    StatusCode::NO_CONTENT
}
