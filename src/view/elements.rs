//! Rendered dashboard elements.

use super::Element;
use crate::api::{Check, CheckId, CheckKind, Domain, DomainId};

use serde::Serialize;

/// A domain row. Its chart lives under `ChartKey::Domain(id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainElement {
    pub id: DomainId,
    pub name: String,
    pub serial: u64,
}

impl Element for DomainElement {
    type Key = DomainId;
    type Source = Domain;

    fn source_key(source: &Domain) -> DomainId {
        source.id
    }

    fn build(source: &Domain, serial: u64) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            serial,
        }
    }

    fn key(&self) -> DomainId {
        self.id
    }

    fn patch(&mut self, source: &Domain) -> bool {
        if self.name == source.name {
            return false;
        }
        self.name = source.name.clone();
        true
    }
}

/// A check row under its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckElement {
    pub id: CheckId,
    pub kind: CheckKind,
    pub type_label: String,
    pub enabled: bool,
    pub status_label: String,
    pub detail: String,
    pub serial: u64,
}

impl CheckElement {
    fn status_label(enabled: bool) -> &'static str {
        if enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    }

    /// Summary line shown under the check, e.g. `Interval: 60s | Path: /health`.
    pub fn detail_text(check: &Check) -> String {
        let mut detail = format!("Interval: {}s", check.interval_seconds);
        if let Some(params) = &check.params {
            if let Some(path) = params.path.as_deref().filter(|p| !p.is_empty()) {
                detail.push_str(&format!(" | Path: {}", path));
            }
            if let Some(port) = params.port {
                detail.push_str(&format!(" | Port: {}", port));
            }
        }
        if check.realtime_mode {
            detail.push_str(" | Realtime");
        }
        detail
    }
}

impl Element for CheckElement {
    type Key = CheckId;
    type Source = Check;

    fn source_key(source: &Check) -> CheckId {
        source.id
    }

    fn build(source: &Check, serial: u64) -> Self {
        Self {
            id: source.id,
            kind: source.kind,
            type_label: source.kind.as_str().to_uppercase(),
            enabled: source.enabled,
            status_label: Self::status_label(source.enabled).to_string(),
            detail: Self::detail_text(source),
            serial,
        }
    }

    fn key(&self) -> CheckId {
        self.id
    }

    fn patch(&mut self, source: &Check) -> bool {
        let detail = Self::detail_text(source);
        let changed = self.enabled != source.enabled || self.kind != source.kind || self.detail != detail;

        self.kind = source.kind;
        self.type_label = source.kind.as_str().to_uppercase();
        self.enabled = source.enabled;
        self.status_label = Self::status_label(source.enabled).to_string();
        self.detail = detail;
        changed
    }
}
