//! Configuration module for the DomainPulse dashboard.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::aggregate::{WindowSpec, MAX_WINDOW_COUNT, MAX_WINDOW_SECS};
use crate::dashboard::DashboardOptions;

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Dashboard configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL of the monitoring backend (default: "http://localhost:8080")
    pub api_base: String,
    /// HTTP port for the dashboard server (default: 8090)
    pub http_port: u16,
    /// Seconds between refresh cycles (default: 30)
    pub refresh_secs: u64,
    /// Backend request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Number of chart windows (default: 10)
    pub window_count: usize,
    /// Width of one chart window in seconds (default: 60)
    pub window_secs: i64,
    /// Results requested per check for charts (default: 100)
    pub results_page_size: u32,
    /// How long to wait for a chart surface to become ready, in ms (default: 500)
    pub surface_ready_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            http_port: 8090,
            refresh_secs: 30,
            request_timeout_secs: 10,
            window_count: 10,
            window_secs: 60,
            results_page_size: 100,
            surface_ready_ms: 500,
        }
    }
}

fn parse_positive<T>(value: Option<String>, current: &mut T)
where
    T: FromStr + PartialOrd + Default,
{
    if let Some(parsed) = value.and_then(|v| v.trim().parse::<T>().ok()) {
        if parsed > T::default() {
            *current = parsed;
        }
    }
}

/// Like `parse_positive`, but values above `max` also keep the current value.
fn parse_bounded<T>(value: Option<String>, max: T, current: &mut T)
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let mut parsed = *current;
    parse_positive(value, &mut parsed);
    if parsed <= max {
        *current = parsed;
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DOMAINPULSE_API_BASE`: backend base URL
    /// - `DOMAINPULSE_HTTP_PORT`: HTTP port
    /// - `DOMAINPULSE_REFRESH_SECS`: refresh interval
    /// - `DOMAINPULSE_REQUEST_TIMEOUT_SECS`: backend request timeout
    /// - `DOMAINPULSE_WINDOW_COUNT`: number of chart windows
    /// - `DOMAINPULSE_WINDOW_SECS`: chart window width
    /// - `DOMAINPULSE_RESULTS_PAGE_SIZE`: results per check for charts
    /// - `DOMAINPULSE_SURFACE_READY_MS`: chart surface readiness timeout
    ///
    /// Values that are missing, unparseable or zero keep their default. Window
    /// settings above one day per window or 1440 windows keep theirs too.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(base) = lookup("DOMAINPULSE_API_BASE") {
            let base = base.trim();
            if !base.is_empty() {
                cfg.api_base = base.trim_end_matches('/').to_string();
            }
        }

        parse_positive(lookup("DOMAINPULSE_HTTP_PORT"), &mut cfg.http_port);
        parse_positive(lookup("DOMAINPULSE_REFRESH_SECS"), &mut cfg.refresh_secs);
        parse_positive(
            lookup("DOMAINPULSE_REQUEST_TIMEOUT_SECS"),
            &mut cfg.request_timeout_secs,
        );
        parse_bounded(
            lookup("DOMAINPULSE_WINDOW_COUNT"),
            MAX_WINDOW_COUNT,
            &mut cfg.window_count,
        );
        parse_bounded(
            lookup("DOMAINPULSE_WINDOW_SECS"),
            MAX_WINDOW_SECS,
            &mut cfg.window_secs,
        );
        parse_positive(lookup("DOMAINPULSE_RESULTS_PAGE_SIZE"), &mut cfg.results_page_size);
        parse_positive(lookup("DOMAINPULSE_SURFACE_READY_MS"), &mut cfg.surface_ready_ms);

        cfg
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            windows: WindowSpec::new(self.window_count, self.window_secs),
            page_size: self.results_page_size,
            surface_ready_timeout: Duration::from_millis(self.surface_ready_ms),
        }
    }
}
