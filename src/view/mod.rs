//! View synchronization.
//!
//! Keeps long-lived chart bindings and rendered entity lists in step with the
//! backend without rebuilding them on every refresh.

mod binding;
mod elements;
mod reconcile;
mod series;
mod snapshot;

pub use binding::*;
pub use elements::*;
pub use reconcile::*;
pub use series::*;
pub use snapshot::*;

use crate::api::{CheckId, DomainId};

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identity of a chart surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartKey {
    /// Combined chart of all checks of a domain.
    Domain(DomainId),
    /// Per-check chart in the detail view.
    Check(CheckId),
    /// Server-aggregated interval chart in the detail view.
    Intervals(CheckId),
}

impl fmt::Display for ChartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKey::Domain(id) => write!(f, "domain-{}", id),
            ChartKey::Check(id) => write!(f, "check-{}", id),
            ChartKey::Intervals(id) => write!(f, "intervals-{}", id),
        }
    }
}

impl FromStr for ChartKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("invalid chart key: {}", s))?;
        let id: i64 = id.parse().map_err(|_| format!("invalid chart id: {}", id))?;

        match kind {
            "domain" => Ok(ChartKey::Domain(id)),
            "check" => Ok(ChartKey::Check(id)),
            "intervals" => Ok(ChartKey::Intervals(id)),
            other => Err(format!("unknown chart kind: {}", other)),
        }
    }
}

impl Serialize for ChartKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Y axis a series is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Count,
    Latency,
}

/// One labeled numeric series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub axis: Axis,
    pub values: Vec<f64>,
}

/// Everything a chart needs to draw: x labels plus series of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

/// Opaque handle to a chart owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle(pub u64);

/// Renderer error types.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("chart handle {0:?} is no longer live")]
    StaleHandle(ChartHandle),
    #[error("renderer failed: {0}")]
    Backend(String),
}

/// The charting primitive. Implementations own the actual drawing resources,
/// so every handle returned by `create` must eventually be passed to `dispose`.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// Resolves once the surface for `key` can host a chart, or `false` if it never will.
    async fn surface_ready(&self, key: ChartKey) -> bool;

    fn create(&self, key: ChartKey, data: &ChartData) -> Result<ChartHandle, RenderError>;

    /// Replace labels and series in place and redraw without animation.
    fn update(&self, handle: ChartHandle, data: &ChartData) -> Result<(), RenderError>;

    fn dispose(&self, handle: ChartHandle);
}
