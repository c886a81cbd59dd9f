//! `LogFilter`: a pure predicate over a log, order-preserving.

use std::sync::Arc;

use crate::log::Log;
use crate::task::{RunMode, Task, TaskContext, TaskImplementationID, TaskLabels, TaskReference};

/// Builds a `LogFilter` task keeping only logs for which `predicate`
/// returns true. Input order is preserved ("stable order
/// preserved").
pub fn build_filter(
    id: TaskImplementationID<Vec<Arc<Log>>>,
    logs: TaskReference<Vec<Arc<Log>>>,
    predicate: Arc<dyn Fn(&Log) -> bool + Send + Sync>,
) -> Task<Vec<Arc<Log>>> {
    let deps = vec![logs.untyped()];
    Task::new(
        id,
        deps,
        TaskLabels::new("filters a log list by a pure predicate, preserving order"),
        Arc::new(move |ctx: TaskContext, _mode: RunMode| {
            let logs = logs.clone();
            let predicate = predicate.clone();
            Box::pin(async move {
                let input = ctx.get_result(&logs);
                Ok(input.into_iter().filter(|log| predicate(log)).collect())
            })
        }),
    )
}
