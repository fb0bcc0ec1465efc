//! Chart binding lifecycle.
//!
//! A binding ties a `ChartKey` to a live renderer handle. Surfaces are
//! attached when their element is created and detached when it is removed;
//! detaching disposes the binding on the spot, so a handle can never outlive
//! its element.

use super::{ChartData, ChartHandle, ChartKey, ChartRenderer, RenderError};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// What a `bind` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Created,
    Updated,
    /// No attached surface, or the surface never became ready.
    Skipped,
}

/// Owns every chart handle the dashboard created.
pub struct BindingTable {
    renderer: Arc<dyn ChartRenderer>,
    bindings: HashMap<ChartKey, ChartHandle>,
    attached: HashSet<ChartKey>,
    ready_timeout: Duration,
}

impl BindingTable {
    pub fn new(renderer: Arc<dyn ChartRenderer>, ready_timeout: Duration) -> Self {
        Self {
            renderer,
            bindings: HashMap::new(),
            attached: HashSet::new(),
            ready_timeout,
        }
    }

    /// Record that a surface for `key` now exists.
    pub fn attach(&mut self, key: ChartKey) {
        self.attached.insert(key);
    }

    /// Record that the surface for `key` is gone, disposing its binding first.
    pub fn detach(&mut self, key: ChartKey) {
        self.dispose(key);
        self.attached.remove(&key);
    }

    pub fn is_attached(&self, key: ChartKey) -> bool {
        self.attached.contains(&key)
    }

    pub fn is_bound(&self, key: ChartKey) -> bool {
        self.bindings.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Push `data` to the chart for `key`, creating the chart if needed.
    pub async fn bind(&mut self, key: ChartKey, data: &ChartData) -> Result<BindOutcome, RenderError> {
        if !self.attached.contains(&key) {
            tracing::debug!("BindingTable: no surface for {}, skipping", key);
            return Ok(BindOutcome::Skipped);
        }

        if let Some(handle) = self.bindings.get(&key).copied() {
            match self.renderer.update(handle, data) {
                Ok(()) => return Ok(BindOutcome::Updated),
                Err(e) => {
                    tracing::debug!("BindingTable: update of {} failed ({}), recreating", key, e);
                    self.dispose(key);
                }
            }
        }

        let ready = tokio::time::timeout(self.ready_timeout, self.renderer.surface_ready(key))
            .await
            .unwrap_or(false);
        if !ready {
            tracing::debug!("BindingTable: surface for {} not ready, skipping", key);
            return Ok(BindOutcome::Skipped);
        }

        let handle = self.renderer.create(key, data)?;
        self.bindings.insert(key, handle);
        tracing::debug!("BindingTable: created chart {}", key);
        Ok(BindOutcome::Created)
    }

    /// Dispose the binding for `key`. Returns whether one existed.
    pub fn dispose(&mut self, key: ChartKey) -> bool {
        match self.bindings.remove(&key) {
            Some(handle) => {
                self.renderer.dispose(handle);
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&mut self) {
        for (_, handle) in self.bindings.drain() {
            self.renderer.dispose(handle);
        }
    }
}

impl Drop for BindingTable {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRenderer;
    use crate::view::{Axis, Series};

    fn data(n: f64) -> ChartData {
        ChartData {
            labels: vec!["12:00".to_string()],
            series: vec![Series {
                label: "Success".to_string(),
                axis: Axis::Count,
                values: vec![n],
            }],
        }
    }

    fn table(renderer: &Arc<RecordingRenderer>) -> BindingTable {
        BindingTable::new(renderer.clone(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_create_then_update_in_place() {
        let renderer = Arc::new(RecordingRenderer::new());
        let mut bindings = table(&renderer);
        let key = ChartKey::Domain(1);
        bindings.attach(key);

        assert_eq!(bindings.bind(key, &data(1.0)).await.unwrap(), BindOutcome::Created);
        assert_eq!(bindings.bind(key, &data(2.0)).await.unwrap(), BindOutcome::Updated);
        assert_eq!(bindings.bind(key, &data(3.0)).await.unwrap(), BindOutcome::Updated);

        assert_eq!(renderer.created(), 1);
        assert_eq!(renderer.updated(), 2);
        assert_eq!(renderer.latest(key).unwrap(), data(3.0));
    }

    #[tokio::test]
    async fn test_unattached_surface_is_skipped() {
        let renderer = Arc::new(RecordingRenderer::new());
        let mut bindings = table(&renderer);

        let outcome = bindings.bind(ChartKey::Check(5), &data(1.0)).await.unwrap();
        assert_eq!(outcome, BindOutcome::Skipped);
        assert_eq!(renderer.created(), 0);
    }

    #[tokio::test]
    async fn test_detach_disposes_exactly_once() {
        let renderer = Arc::new(RecordingRenderer::new());
        let mut bindings = table(&renderer);
        let key = ChartKey::Domain(1);
        bindings.attach(key);
        bindings.bind(key, &data(1.0)).await.unwrap();

        bindings.detach(key);
        bindings.detach(key);
        assert!(!bindings.dispose(key));

        assert_eq!(renderer.disposed(), 1);
        assert_eq!(renderer.live(), 0);
        assert!(renderer.no_double_dispose());

        // A late refresh for the removed entity is dropped
        let outcome = bindings.bind(key, &data(2.0)).await.unwrap();
        assert_eq!(outcome, BindOutcome::Skipped);
        assert_eq!(renderer.created(), 1);
    }

    #[tokio::test]
    async fn test_stale_handle_is_replaced() {
        let renderer = Arc::new(RecordingRenderer::new());
        let mut bindings = table(&renderer);
        let key = ChartKey::Domain(1);
        bindings.attach(key);
        bindings.bind(key, &data(1.0)).await.unwrap();

        renderer.drop_surface(key);
        assert_eq!(bindings.bind(key, &data(2.0)).await.unwrap(), BindOutcome::Created);

        assert_eq!(renderer.created(), 2);
        assert_eq!(renderer.disposed(), 1);
        assert_eq!(renderer.live(), 1);
        assert!(renderer.no_double_dispose());
    }

    #[tokio::test]
    async fn test_surface_never_ready() {
        let renderer = Arc::new(RecordingRenderer::never_ready());
        let mut bindings = table(&renderer);
        let key = ChartKey::Domain(1);
        bindings.attach(key);

        assert_eq!(bindings.bind(key, &data(1.0)).await.unwrap(), BindOutcome::Skipped);
        assert!(!bindings.is_bound(key));
    }

    #[test]
    fn test_drop_disposes_remaining_bindings() {
        let renderer = Arc::new(RecordingRenderer::new());
        {
            let mut bindings = table(&renderer);
            for id in 1..=3 {
                bindings.attach(ChartKey::Domain(id));
            }
            tokio_test::block_on(async {
                for id in 1..=3 {
                    bindings.bind(ChartKey::Domain(id), &data(0.0)).await.unwrap();
                }
            });
            assert_eq!(bindings.len(), 3);
        }
        assert_eq!(renderer.disposed(), 3);
        assert_eq!(renderer.live(), 0);
        assert!(renderer.no_double_dispose());
    }
}
