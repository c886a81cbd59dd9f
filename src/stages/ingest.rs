//! `LogIngester`: an identity pass that registers a log list's
//! result under its own task ID for downstream consumers wanting the full,
//! unfiltered, ungrouped view.

use std::sync::Arc;

use crate::log::Log;
use crate::task::{RunMode, Task, TaskContext, TaskImplementationID, TaskLabels, TaskReference};

pub fn build_ingester(
    id: TaskImplementationID<Vec<Arc<Log>>>,
    logs: TaskReference<Vec<Arc<Log>>>,
) -> Task<Vec<Arc<Log>>> {
    let deps = vec![logs.untyped()];
    Task::new(
        id,
        deps,
        TaskLabels::new("identity pass exposing the full log list to downstream consumers"),
        Arc::new(move |ctx: TaskContext, _mode: RunMode| {
            let logs = logs.clone();
            Box::pin(async move { Ok(ctx.get_result(&logs)) })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Node;
    use crate::task::{ErasedTask, ProgressHandle};
    use crate::typed_map::TypedKeyMap;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn ingest_is_identity() {
        let logs: Vec<Arc<Log>> = vec![Arc::new(Log::new(1, Node::map(Vec::<(String, Node)>::new())))];
        let results = Arc::new(TypedKeyMap::new());
        results.set("logs", logs.clone());

        let logs_ref: TaskReference<Vec<Arc<Log>>> = TaskReference::new(TaskImplementationID::new("logs"));
        let task = build_ingester(TaskImplementationID::new("ingest"), logs_ref.clone());
        let ctx = TaskContext::new(results, vec![logs_ref.untyped()], ProgressHandle::new("ingest"), CancellationToken::new());
        let erased = task.run_erased(ctx, RunMode::Run).await.unwrap();
        let out = erased.downcast::<Vec<Arc<Log>>>().unwrap();
        assert_eq!(out.len(), 1);
    }
}
