//! Per-task progress counters and the periodic reporter that samples them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

/// A cheap, shareable pair of atomic counters a task updates as it makes
/// progress. Stages report `completed/total`.
#[derive(Clone)]
pub struct ProgressHandle {
    task_id: Arc<str>,
    completed: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl ProgressHandle {
    pub fn new(task_id: impl Into<Arc<str>>) -> Self {
        Self {
            task_id: task_id.into(),
            completed: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn add_completed(&self, delta: u64) {
        self.completed.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            task_id: self.task_id.clone(),
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of a [`ProgressHandle`].
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub task_id: Arc<str>,
    pub completed: u64,
    pub total: u64,
}

/// Samples a set of [`ProgressHandle`]s at a fixed interval and records the
/// snapshots on the run. A no-op handle set just logs nothing and returns
/// immediately when polled.
pub struct ProgressReporter {
    handles: Vec<ProgressHandle>,
}

impl ProgressReporter {
    pub fn new(handles: Vec<ProgressHandle>) -> Self {
        Self { handles }
    }

    /// Runs until `shutdown` resolves, emitting one tracing event per
    /// handle every `interval` (1 Hz in production).
    pub async fn run_until(&self, interval: std::time::Duration, shutdown: impl std::future::Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for snapshot in self.snapshot_all() {
                        info!(
                            task_id = %snapshot.task_id,
                            completed = snapshot.completed,
                            total = snapshot.total,
                            "progress"
                        );
                    }
                }
                _ = &mut shutdown => break,
            }
        }
    }

    pub fn snapshot_all(&self) -> Vec<ProgressSnapshot> {
        self.handles.iter().map(ProgressHandle::snapshot).collect()
    }
}
