//! The task DAG engine: typed task identifiers, a dependency-declaring
//! `Task<T>`, an object-safe `ErasedTask` wrapper, a `Registry` of tasks,
//! `Plan`ning (transitive closure, cycle detection, topological order), and
//! bounded-concurrency `Execution`.

mod executor;
mod id;
mod metadata;
mod plan;
mod progress;
mod registry;

pub use executor::{ExecutionError, ExecutionReport, Executor};
pub use id::{TaskImplementationID, TaskReference, UntypedTaskReference};
pub use metadata::{MessageLevel, RunMessage, RunMetadata};
pub use plan::{Plan, PlanError};
pub use progress::{ProgressHandle, ProgressReporter, ProgressSnapshot};
pub use registry::{Registry, RegistryError};

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::KhiResult;
use crate::typed_map::TypedKeyMap;

/// Whether a task should produce a real result (`Run`) or merely validate
/// that it *could* run (declared dependencies resolvable, inputs valid)
/// without doing the possibly expensive work (`DryRun`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    DryRun,
    Run,
}

impl RunMode {
    pub fn is_dry_run(self) -> bool {
        matches!(self, RunMode::DryRun)
    }
}

/// Static metadata about a task, independent of any particular run.
#[derive(Debug, Clone)]
pub struct TaskLabels {
    pub feature: Option<String>,
    pub description: String,
}

impl TaskLabels {
    pub fn new(description: impl Into<String>) -> Self {
        Self { feature: None, description: description.into() }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }
}

/// Shared state handed to a running task. Every field is `Arc`-owned so a
/// task's closure can return a `'static` boxed future without borrowing
/// from the context that spawned it.
#[derive(Clone)]
pub struct TaskContext {
    results: Arc<TypedKeyMap>,
    declared_dependencies: Arc<Vec<UntypedTaskReference>>,
    progress: ProgressHandle,
    cancellation: CancellationToken,
    metadata: RunMetadata,
}

impl TaskContext {
    pub fn new(
        results: Arc<TypedKeyMap>,
        declared_dependencies: Vec<UntypedTaskReference>,
        progress: ProgressHandle,
        cancellation: CancellationToken,
    ) -> Self {
        Self::with_metadata(results, declared_dependencies, progress, cancellation, RunMetadata::new())
    }

    pub fn with_metadata(
        results: Arc<TypedKeyMap>,
        declared_dependencies: Vec<UntypedTaskReference>,
        progress: ProgressHandle,
        cancellation: CancellationToken,
        metadata: RunMetadata,
    ) -> Self {
        Self {
            results,
            declared_dependencies: Arc::new(declared_dependencies),
            progress,
            cancellation,
            metadata,
        }
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// Fetches a dependency's result. Panics if `reference` was not in the
    /// task's declared dependency list: undeclared dependency access is a
    /// programming error, not a recoverable one, since it means the
    /// planner built an incomplete closure.
    pub fn get_result<T: Clone + Send + Sync + 'static>(&self, reference: &TaskReference<T>) -> T {
        let untyped = reference.untyped();
        if !self.declared_dependencies.contains(&untyped) {
            panic!(
                "task accessed result of '{}' without declaring it as a dependency",
                untyped.id()
            );
        }
        self.results
            .get::<T>(untyped.id())
            .unwrap_or_else(|e| panic!("dependency '{}' has no stored result: {e}", untyped.id()))
    }

    fn store_result<T: Clone + Send + Sync + 'static>(&self, id: &str, value: T) {
        self.results.set(id, value);
    }
}

pub type TaskRunFn<T> =
    Arc<dyn Fn(TaskContext, RunMode) -> Pin<Box<dyn Future<Output = KhiResult<T>> + Send>> + Send + Sync>;

/// A single node in the task DAG: an identity, a declared dependency list,
/// labels, and the closure that produces `T`.
#[derive(Clone)]
pub struct Task<T> {
    id: TaskImplementationID<T>,
    dependencies: Vec<UntypedTaskReference>,
    labels: TaskLabels,
    run: TaskRunFn<T>,
}

impl<T: Clone + Send + Sync + 'static> Task<T> {
    pub fn new(
        id: TaskImplementationID<T>,
        dependencies: Vec<UntypedTaskReference>,
        labels: TaskLabels,
        run: TaskRunFn<T>,
    ) -> Self {
        Self { id, dependencies, labels, run }
    }

    pub fn reference(&self) -> TaskReference<T> {
        TaskReference::new(self.id.clone())
    }
}

/// Object-safe view of a [`Task<T>`] used by the [`Registry`] and
/// [`Executor`], which must hold heterogeneous tasks in one collection.
#[async_trait]
pub trait ErasedTask: Send + Sync {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[UntypedTaskReference];
    fn labels(&self) -> &TaskLabels;
    async fn run_erased(&self, ctx: TaskContext, mode: RunMode) -> KhiResult<Arc<dyn Any + Send + Sync>>;
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> ErasedTask for Task<T> {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn dependencies(&self) -> &[UntypedTaskReference] {
        &self.dependencies
    }

    fn labels(&self) -> &TaskLabels {
        &self.labels
    }

    async fn run_erased(&self, ctx: TaskContext, mode: RunMode) -> KhiResult<Arc<dyn Any + Send + Sync>> {
        let value = (self.run)(ctx.clone(), mode).await?;
        ctx.store_result(self.id(), value.clone());
        Ok(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: &str, deps: Vec<UntypedTaskReference>, value: i64) -> Task<i64> {
        Task::new(
            TaskImplementationID::new(id),
            deps,
            TaskLabels::new("test task"),
            Arc::new(move |_ctx, _mode| Box::pin(async move { Ok(value) })),
        )
    }

    #[tokio::test]
    async fn run_erased_stores_and_returns_result() {
        let task = make_task("a", vec![], 42);
        let ctx = TaskContext::new(
            Arc::new(TypedKeyMap::new()),
            vec![],
            ProgressHandle::new("a"),
            CancellationToken::new(),
        );
        let erased = task.run_erased(ctx.clone(), RunMode::Run).await.unwrap();
        assert_eq!(*erased.downcast::<i64>().unwrap(), 42);
        assert_eq!(ctx.results.get::<i64>("a").unwrap(), 42);
    }

    #[tokio::test]
    #[should_panic(expected = "without declaring it as a dependency")]
    async fn get_result_panics_on_undeclared_dependency() {
        let results = Arc::new(TypedKeyMap::new());
        results.set("other", 7i64);
        let ctx = TaskContext::new(results, vec![], ProgressHandle::new("a"), CancellationToken::new());
        let reference: TaskReference<i64> = TaskReference::new(TaskImplementationID::new("other"));
        ctx.get_result(&reference);
    }
}
