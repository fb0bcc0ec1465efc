//! Wire and domain types for the monitoring backend.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type DomainId = i64;
pub type CheckId = i64;

/// A monitored domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
}

/// Check protocol. Parsed case-insensitively; anything unknown is kept as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckKind {
    Http,
    Tcp,
    Udp,
    Tls,
    Icmp,
    Unknown,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Http => "http",
            CheckKind::Tcp => "tcp",
            CheckKind::Udp => "udp",
            CheckKind::Tls => "tls",
            CheckKind::Icmp => "icmp",
            CheckKind::Unknown => "unknown",
        }
    }

    /// HTTP checks track response classes (2xx/4xx/5xx/timeout).
    pub fn is_fine_grained(&self) -> bool {
        matches!(self, CheckKind::Http)
    }

    /// Whether checks of this kind need a target port.
    pub fn requires_port(&self) -> bool {
        matches!(self, CheckKind::Tcp | CheckKind::Udp | CheckKind::Tls)
    }
}

impl From<String> for CheckKind {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => CheckKind::Http,
            "tcp" => CheckKind::Tcp,
            "udp" => CheckKind::Udp,
            "tls" => CheckKind::Tls,
            "icmp" => CheckKind::Icmp,
            _ => CheckKind::Unknown,
        }
    }
}

impl From<CheckKind> for String {
    fn from(kind: CheckKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol-specific check parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// A check configured on a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub id: CheckId,
    #[serde(default)]
    pub domain_id: DomainId,
    #[serde(rename = "type")]
    pub kind: CheckKind,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub interval_seconds: u64,
    #[serde(default)]
    pub params: Option<CheckParams>,
    #[serde(default)]
    pub realtime_mode: bool,
    #[serde(default)]
    pub rate_limit_per_minute: u32,
}

/// Request body for creating a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCheck {
    #[serde(rename = "type")]
    pub kind: CheckKind,
    pub interval_seconds: u64,
    #[serde(default)]
    pub params: CheckParams,
    #[serde(default)]
    pub realtime_mode: bool,
    #[serde(default)]
    pub rate_limit_per_minute: u32,
}

/// Coarse status reported by the backend for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failure,
    Timeout,
    Unrecognized,
}

impl ResultStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => ResultStatus::Success,
            "failure" => ResultStatus::Failure,
            "timeout" => ResultStatus::Timeout,
            _ => ResultStatus::Unrecognized,
        }
    }
}

/// Response class for HTTP observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[serde(rename = "2xx")]
    Class2xx,
    #[serde(rename = "4xx")]
    Class4xx,
    #[serde(rename = "5xx")]
    Class5xx,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "other")]
    Other,
}

impl Outcome {
    /// Empty tags mean "no outcome"; unknown tags are kept as `Other`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" => None,
            "2xx" => Some(Outcome::Class2xx),
            "4xx" => Some(Outcome::Class4xx),
            "5xx" => Some(Outcome::Class5xx),
            "timeout" => Some(Outcome::Timeout),
            _ => Some(Outcome::Other),
        }
    }
}

/// One raw observation of a check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawResult {
    pub timestamp: DateTime<Utc>,
    pub status: ResultStatus,
    pub duration_ms: Option<f64>,
    pub outcome: Option<Outcome>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

impl RawResult {
    pub fn new(timestamp: DateTime<Utc>, status: ResultStatus) -> Self {
        Self {
            timestamp,
            status,
            duration_ms: None,
            outcome: None,
            status_code: None,
            error_message: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Latency only counts when the backend actually measured one.
    pub fn latency_ms(&self) -> Option<f64> {
        self.duration_ms.filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// A result as the backend serializes it. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResult {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl WireResult {
    /// Convert to a `RawResult`. Results without a parseable timestamp are dropped.
    pub fn into_raw(self) -> Option<RawResult> {
        let timestamp = parse_api_time(self.created_at.as_deref()?)?;
        Some(RawResult {
            timestamp,
            status: ResultStatus::parse(self.status.as_deref().unwrap_or_default()),
            duration_ms: self.duration_ms.filter(|d| *d >= 0.0),
            outcome: self.outcome.as_deref().and_then(Outcome::parse),
            status_code: self.status_code.filter(|c| *c != 0),
            error_message: self.error_message.filter(|m| !m.is_empty()),
        })
    }
}

/// `GET /checks/{id}/results` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsPage {
    #[serde(default)]
    pub results: Option<Vec<WireResult>>,
}

impl ResultsPage {
    pub fn into_results(self) -> Vec<RawResult> {
        self.results
            .unwrap_or_default()
            .into_iter()
            .filter_map(WireResult::into_raw)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub p95: f64,
}

/// `GET /checks/{id}/stats` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckStats {
    #[serde(default)]
    pub total_results: u64,
    pub latency_stats: LatencyStats,
    pub status_distribution: BTreeMap<String, u64>,
}

impl CheckStats {
    /// Percentage of `success` among all reported statuses, 0 when nothing was reported.
    pub fn success_rate(&self) -> f64 {
        let total: u64 = self.status_distribution.values().sum();
        if total == 0 {
            return 0.0;
        }
        let success = self.status_distribution.get("success").copied().unwrap_or(0);
        success as f64 * 100.0 / total as f64
    }
}

/// One server-aggregated point from `GET /checks/{id}/intervals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalPoint {
    #[serde(deserialize_with = "deserialize_api_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub avg_latency: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalsPage {
    pub data: Vec<IntervalPoint>,
}

/// Aggregation interval offered by the backend, with the lookback it is shown over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalPeriod {
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl IntervalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalPeriod::OneMinute => "1m",
            IntervalPeriod::FiveMinutes => "5m",
            IntervalPeriod::OneHour => "1h",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(IntervalPeriod::OneMinute),
            "5m" => Some(IntervalPeriod::FiveMinutes),
            "1h" => Some(IntervalPeriod::OneHour),
            _ => None,
        }
    }

    pub fn lookback(&self) -> ChronoDuration {
        match self {
            IntervalPeriod::OneMinute => ChronoDuration::hours(1),
            IntervalPeriod::FiveMinutes => ChronoDuration::hours(24),
            IntervalPeriod::OneHour => ChronoDuration::days(7),
        }
    }

    /// Range ending at `now` covering this period's lookback.
    pub fn range_ending(&self, now: DateTime<Utc>) -> TimeRange {
        TimeRange {
            from: now - self.lookback(),
            to: now,
        }
    }
}

/// Half-open time range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Query parameter pairs in the backend's expected form.
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("from", self.from.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("to", self.to.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ]
    }
}

/// Parameters for a results listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsQuery {
    pub range: Option<TimeRange>,
    pub page: u32,
    pub page_size: u32,
}

impl ResultsQuery {
    pub fn in_range(range: TimeRange, page_size: u32) -> Self {
        Self {
            range: Some(range),
            page: 1,
            page_size,
        }
    }

    pub fn latest(page_size: u32) -> Self {
        Self {
            range: None,
            page: 1,
            page_size,
        }
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 and the space-separated `YYYY-MM-DD HH:MM:SS[.fff]` form,
/// which is taken to be UTC.
pub fn parse_api_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    let naive = s.trim_end_matches('Z');
    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    None
}

fn deserialize_api_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_api_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_api_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 12, 34, 56).unwrap();

        assert_eq!(parse_api_time("2024-01-01T12:34:56Z"), Some(expected));
        assert_eq!(parse_api_time("2024-01-01T14:34:56+02:00"), Some(expected));
        assert_eq!(parse_api_time("2024-01-01 12:34:56"), Some(expected));
        assert_eq!(parse_api_time("2024-01-01T12:34:56"), Some(expected));

        let frac = parse_api_time("2024-01-01 12:34:56.250").unwrap();
        assert_eq!(frac.timestamp_millis(), expected.timestamp_millis() + 250);

        assert!(parse_api_time("yesterday").is_none());
        assert!(parse_api_time("").is_none());
    }

    #[test]
    fn test_check_kind_is_case_insensitive() {
        let check: Check =
            serde_json::from_str(r#"{"id":3,"type":"HTTP","enabled":true,"interval_seconds":60}"#)
                .unwrap();
        assert_eq!(check.kind, CheckKind::Http);
        assert!(check.kind.is_fine_grained());
        assert!(check.params.is_none());

        let other: Check = serde_json::from_str(r#"{"id":4,"type":"dns"}"#).unwrap();
        assert_eq!(other.kind, CheckKind::Unknown);
        assert!(!other.enabled);
    }

    #[test]
    fn test_wire_result_conversion() {
        let page: ResultsPage = serde_json::from_str(
            r#"{"results":[
                {"created_at":"2024-01-01 12:00:10","status":"success","duration_ms":120,"outcome":"2xx","status_code":200},
                {"created_at":"2024-01-01T12:00:20Z","status":"weird","duration_ms":0,"outcome":"","status_code":0,"error_message":""},
                {"status":"success"}
            ]}"#,
        )
        .unwrap();

        let results = page.into_results();
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].status, ResultStatus::Success);
        assert_eq!(results[0].outcome, Some(Outcome::Class2xx));
        assert_eq!(results[0].latency_ms(), Some(120.0));
        assert_eq!(results[0].status_code, Some(200));

        assert_eq!(results[1].status, ResultStatus::Unrecognized);
        assert_eq!(results[1].outcome, None);
        assert_eq!(results[1].latency_ms(), None);
        assert_eq!(results[1].status_code, None);
        assert_eq!(results[1].error_message, None);
    }

    #[test]
    fn test_results_page_missing_or_null_results() {
        let missing: ResultsPage = serde_json::from_str("{}").unwrap();
        assert!(missing.into_results().is_empty());

        let null: ResultsPage = serde_json::from_str(r#"{"results":null}"#).unwrap();
        assert!(null.into_results().is_empty());

        assert!(serde_json::from_str::<ResultsPage>(r#"{"results":"nope"}"#).is_err());
    }

    #[test]
    fn test_success_rate() {
        let stats: CheckStats = serde_json::from_str(
            r#"{"total_results":10,"latency_stats":{"avg":80.5,"p95":200},
                "status_distribution":{"success":3,"failure":1}}"#,
        )
        .unwrap();
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);

        let empty = CheckStats {
            total_results: 0,
            latency_stats: LatencyStats::default(),
            status_distribution: BTreeMap::new(),
        };
        assert_eq!(empty.success_rate(), 0.0);

        assert!(serde_json::from_str::<CheckStats>(r#"{"total_results":1}"#).is_err());
    }

    #[test]
    fn test_interval_period_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let range = IntervalPeriod::OneHour.range_ending(now);
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.to, now);

        assert_eq!(IntervalPeriod::parse("5m"), Some(IntervalPeriod::FiveMinutes));
        assert_eq!(IntervalPeriod::parse("2m"), None);
    }

    #[test]
    fn test_time_range_query_pairs() {
        let range = TimeRange {
            from: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 1, 1, 12, 10, 0).unwrap(),
        };
        let pairs = range.query_pairs();
        assert_eq!(pairs[0], ("from", "2024-01-01T12:00:00.000Z".to_string()));
        assert_eq!(pairs[1], ("to", "2024-01-01T12:10:00.000Z".to_string()));
    }
}
