//! Validation of user input before anything reaches the backend.

use crate::api::{CheckKind, CheckParams, NewCheck};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_HTTP_PATH: &str = "/";
pub const DEFAULT_HTTP_SCHEME: &str = "https";
pub const DEFAULT_HTTP_METHOD: &str = "GET";
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 5000;

/// User input validation error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("domain name is empty")]
    EmptyDomain,
    #[error("invalid domain name: {0}")]
    InvalidDomain(String),
    #[error("unsupported check type: {0}")]
    UnsupportedKind(String),
    #[error("{0} checks need a port between 1 and 65535")]
    InvalidPort(CheckKind),
    #[error("check interval is out of range")]
    InvalidInterval,
}

static HOSTNAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn hostname_regex() -> &'static Regex {
    HOSTNAME_REGEX.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$").unwrap()
    })
}

/// Normalize and validate a domain name.
///
/// Whitespace, a leading `http://` or `https://` and anything after the host
/// are stripped; the rest must be a lower-case dotted hostname.
pub fn validate_domain_name(input: &str) -> Result<String, ValidationError> {
    let lowered = input.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('.');

    if host.is_empty() {
        return Err(ValidationError::EmptyDomain);
    }
    if host.len() > 253 || !hostname_regex().is_match(host) {
        return Err(ValidationError::InvalidDomain(input.trim().to_string()));
    }
    Ok(host.to_string())
}

/// Port for a check of `kind`. Kinds without a port ignore the input.
pub fn validate_port(kind: CheckKind, port: Option<i64>) -> Result<Option<u16>, ValidationError> {
    if !kind.requires_port() {
        return Ok(None);
    }
    match port {
        Some(p) if (1..=65535).contains(&p) => Ok(Some(p as u16)),
        _ => Err(ValidationError::InvalidPort(kind)),
    }
}

/// Unit of the check interval input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Second,
    #[default]
    Minute,
    Hour,
    Day,
}

impl IntervalUnit {
    fn seconds(&self) -> u64 {
        match self {
            IntervalUnit::Second => 1,
            IntervalUnit::Minute => 60,
            IntervalUnit::Hour => 60 * 60,
            IntervalUnit::Day => 24 * 60 * 60,
        }
    }
}

/// Interval in seconds. A zero value counts as one unit.
pub fn interval_to_seconds(unit: IntervalUnit, value: u64) -> Result<u64, ValidationError> {
    value
        .max(1)
        .checked_mul(unit.seconds())
        .ok_or(ValidationError::InvalidInterval)
}

fn default_interval_value() -> u64 {
    1
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Check settings as entered by the user, for creating or editing a check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckForm {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub interval_unit: IntervalUnit,
    #[serde(default = "default_interval_value")]
    pub interval_value: u64,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub realtime_mode: bool,
    #[serde(default)]
    pub rate_limit_per_minute: u32,
}

impl CheckForm {
    /// Validate the form and build the backend request.
    pub fn validate(&self) -> Result<NewCheck, ValidationError> {
        let kind = CheckKind::from(self.kind.clone());
        if kind == CheckKind::Unknown {
            return Err(ValidationError::UnsupportedKind(self.kind.trim().to_string()));
        }

        let mut params = CheckParams {
            port: validate_port(kind, self.port)?,
            timeout_ms: Some(
                self.timeout_ms
                    .filter(|t| *t > 0)
                    .unwrap_or(DEFAULT_CHECK_TIMEOUT_MS),
            ),
            ..Default::default()
        };

        match kind {
            CheckKind::Http => {
                params.path = Some(non_empty(&self.path).unwrap_or_else(|| DEFAULT_HTTP_PATH.to_string()));
                params.scheme =
                    Some(non_empty(&self.scheme).unwrap_or_else(|| DEFAULT_HTTP_SCHEME.to_string()));
                params.method = Some(
                    non_empty(&self.method)
                        .map(|m| m.to_ascii_uppercase())
                        .unwrap_or_else(|| DEFAULT_HTTP_METHOD.to_string()),
                );
                params.body = non_empty(&self.body);
            }
            CheckKind::Tcp | CheckKind::Udp => {
                params.payload = non_empty(&self.payload);
            }
            _ => {}
        }

        Ok(NewCheck {
            kind,
            interval_seconds: interval_to_seconds(self.interval_unit, self.interval_value)?,
            params,
            realtime_mode: self.realtime_mode,
            rate_limit_per_minute: self.rate_limit_per_minute,
        })
    }
}
