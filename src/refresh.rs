//! Periodic refresh with a single re-entrancy guard.
//!
//! Timer ticks that fire while a cycle is still running are skipped, not
//! queued. Refreshes triggered by a user action wait for the running cycle
//! and then run.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio::task::JoinHandle;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Drives refresh cycles on a fixed interval.
pub struct RefreshCoordinator {
    guard: Arc<Semaphore>,
    interval: Duration,
    stop: Arc<Mutex<Option<broadcast::Sender<()>>>>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl RefreshCoordinator {
    pub fn new(interval: Duration) -> Self {
        Self {
            guard: Arc::new(Semaphore::new(1)),
            interval,
            stop: Arc::new(Mutex::new(None)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a cycle currently holds the guard.
    pub fn is_running(&self) -> bool {
        self.guard.available_permits() == 0
    }

    /// Run `cycle` unless another one is in flight. Returns `None` when skipped.
    pub async fn try_run<F: Future>(&self, cycle: F) -> Option<F::Output> {
        let _permit = match self.guard.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!("Skipping refresh, previous cycle still running");
                return None;
            }
        };
        Some(cycle.await)
    }

    /// Wait for any in-flight cycle, then run `cycle`.
    pub async fn run_exclusive<F: Future>(&self, cycle: F) -> F::Output {
        // The semaphore is never closed, so acquisition only waits.
        let _permit = self.guard.acquire().await.ok();
        cycle.await
    }

    /// Start the refresh loop. The first cycle runs immediately.
    pub async fn start<F, Fut, E>(&self, cycle: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, mut rx) = broadcast::channel(1);
        {
            let mut stop_guard = self.stop.lock().await;
            *stop_guard = Some(tx);
        }

        let guard = self.guard.clone();
        let period = self.interval;
        tracing::info!("Refresh loop started (every {:?})", period);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = rx.recv() => {
                        tracing::info!("Refresh loop stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let permit = match guard.clone().try_acquire_owned() {
                            Ok(p) => p,
                            Err(_) => {
                                tracing::warn!("Skipping refresh tick, previous cycle still running");
                                continue;
                            }
                        };

                        let run = cycle();
                        tokio::spawn(async move {
                            let _permit = permit;
                            match run.await {
                                Ok(()) => tracing::debug!("Refresh cycle finished"),
                                Err(e) => tracing::error!("Refresh cycle failed: {}", e),
                            }
                        });
                    }
                }
            }
        })
    }

    /// Stop the refresh loop. A cycle already running is left to finish.
    pub async fn stop(&self) {
        let stop = self.stop.lock().await;
        if let Some(tx) = stop.as_ref() {
            let _ = tx.send(());
        }
    }
}
