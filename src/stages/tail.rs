//! `Tail`: the no-value join task a feature's registration
//! actually asks the engine to run. Succeeds iff every declared dependency
//! completed without a fatal error, which the executor already guarantees
//! by skipping a task whose dependency failed, so `Tail`'s body only needs
//! to exist to give the feature a single reference point.

use std::sync::Arc;

use crate::task::{RunMode, Task, TaskContext, TaskImplementationID, TaskLabels, UntypedTaskReference};

/// Builds a `Tail` task depending on every task in `dependencies` (typically
/// the per-source `LogToTimelineMapper` tasks for one feature).
pub fn build_tail(id: TaskImplementationID<()>, dependencies: Vec<UntypedTaskReference>, description: impl Into<String>) -> Task<()> {
    Task::new(
        id,
        dependencies,
        TaskLabels::new(description.into()),
        Arc::new(|_ctx: TaskContext, _mode: RunMode| Box::pin(async { Ok(()) })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ErasedTask, ProgressHandle};
    use crate::typed_map::TypedKeyMap;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn tail_succeeds_with_no_output() {
        let task = build_tail(TaskImplementationID::new("tail/feature"), vec![], "feature tail");
        let ctx = TaskContext::new(Arc::new(TypedKeyMap::new()), vec![], ProgressHandle::new("tail/feature"), CancellationToken::new());
        let erased = task.run_erased(ctx, RunMode::Run).await.unwrap();
        erased.downcast::<()>().unwrap();
    }
}
