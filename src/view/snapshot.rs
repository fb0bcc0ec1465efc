//! In-memory chart renderer.
//!
//! Holds the latest data of every live chart so it can be served to a
//! front end. Surfaces are always ready.

use super::{ChartData, ChartHandle, ChartKey, ChartRenderer, RenderError};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Charts {
    next_handle: u64,
    live: HashMap<ChartHandle, (ChartKey, ChartData)>,
}

/// Renderer that keeps chart data in memory.
#[derive(Default)]
pub struct SnapshotRenderer {
    charts: Mutex<Charts>,
}

impl SnapshotRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Charts> {
        self.charts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current data of the chart bound under `key`.
    pub fn chart(&self, key: ChartKey) -> Option<ChartData> {
        self.lock()
            .live
            .values()
            .find(|(k, _)| *k == key)
            .map(|(_, data)| data.clone())
    }

    /// All live charts keyed by their string key.
    pub fn charts(&self) -> BTreeMap<String, ChartData> {
        self.lock()
            .live
            .values()
            .map(|(key, data)| (key.to_string(), data.clone()))
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }
}

#[async_trait]
impl ChartRenderer for SnapshotRenderer {
    async fn surface_ready(&self, _key: ChartKey) -> bool {
        true
    }

    fn create(&self, key: ChartKey, data: &ChartData) -> Result<ChartHandle, RenderError> {
        let mut charts = self.lock();
        charts.next_handle += 1;
        let handle = ChartHandle(charts.next_handle);
        charts.live.insert(handle, (key, data.clone()));
        Ok(handle)
    }

    fn update(&self, handle: ChartHandle, data: &ChartData) -> Result<(), RenderError> {
        match self.lock().live.get_mut(&handle) {
            Some((_, current)) => {
                *current = data.clone();
                Ok(())
            }
            None => Err(RenderError::StaleHandle(handle)),
        }
    }

    fn dispose(&self, handle: ChartHandle) {
        self.lock().live.remove(&handle);
    }
}
