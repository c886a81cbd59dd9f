//! `FieldSetRead`: applies a reader to every log in a fixed-size
//! fan-out, recording per-log failures as warnings without dropping the log.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::log::{FieldSetReader, Log};
use crate::task::{MessageLevel, RunMode, Task, TaskContext, TaskImplementationID, TaskLabels, TaskReference};

/// Builds the `FieldSetRead` task for one `reader`. Depends on `logs` (the
/// output of `ListLogEntries` or a grouping stage). In `DryRun` it still
/// runs: reading a FieldSet is a local parse, not expensive I/O, so only
/// the fetch-bound stages skip work in planning mode.
pub fn build_fieldset_read(
    id: TaskImplementationID<Vec<Arc<Log>>>,
    logs: TaskReference<Vec<Arc<Log>>>,
    reader: Arc<dyn FieldSetReader>,
    concurrency: usize,
) -> Task<Vec<Arc<Log>>> {
    let deps = vec![logs.untyped()];
    Task::new(
        id,
        deps,
        TaskLabels::new("computes a FieldSet for every log, fanned out across a fixed pool"),
        Arc::new(move |ctx: TaskContext, _mode: RunMode| {
            let logs = logs.clone();
            let reader = reader.clone();
            Box::pin(async move {
                let input = ctx.get_result(&logs);
                ctx.progress().set_total(input.len() as u64);

                let results: Vec<Arc<Log>> = stream::iter(input.into_iter())
                    .map(|log| {
                        let reader = reader.clone();
                        let ctx = ctx.clone();
                        async move {
                            if let Err(e) = log.field_set(reader.as_ref()) {
                                ctx.metadata().record_message(
                                    "fieldset_read",
                                    MessageLevel::Warning,
                                    format!("log {}: {e}", log.id()),
                                );
                            }
                            ctx.progress().add_completed(1);
                            log
                        }
                    })
                    .buffer_unordered(concurrency.max(1))
                    .collect()
                    .await;

                Ok(results)
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::fieldset::CommonReader;
    use crate::log::Node;
    use crate::task::{ErasedTask, ProgressHandle, Registry, TaskImplementationID};
    use crate::typed_map::TypedKeyMap;
    use tokio_util::sync::CancellationToken;

    fn log_with_timestamp(id: u64, ts: Option<&str>) -> Arc<Log> {
        let metadata = match ts {
            Some(ts) => Node::map([("timestamp".to_string(), Node::str(ts))]),
            None => Node::map(Vec::<(String, Node)>::new()),
        };
        Arc::new(Log::new(id, Node::map([("metadata".to_string(), metadata)])))
    }

    #[tokio::test]
    async fn failing_reader_is_a_warning_not_a_dropped_log() {
        let logs_task = crate::task::Task::new(
            TaskImplementationID::<Vec<Arc<Log>>>::new("logs"),
            vec![],
            TaskLabels::new("fixture"),
            Arc::new(|_ctx, _mode| {
                Box::pin(async {
                    Ok(vec![log_with_timestamp(1, Some("2024-01-01T00:00:00Z")), log_with_timestamp(2, None)])
                })
            }),
        );
        let logs_ref = logs_task.reference();

        let mut registry = Registry::new();
        registry.register(Arc::new(logs_task)).unwrap();

        let read_task = build_fieldset_read(
            TaskImplementationID::new("fieldset_read/common"),
            logs_ref.clone(),
            Arc::new(CommonReader),
            4,
        );

        let results = Arc::new(TypedKeyMap::new());
        let logs_ctx = TaskContext::new(results.clone(), vec![], ProgressHandle::new("logs"), CancellationToken::new());
        registry.get("logs").unwrap().run_erased(logs_ctx, RunMode::Run).await.unwrap();

        let ctx = TaskContext::new(
            results,
            vec![logs_ref.untyped()],
            ProgressHandle::new("fieldset_read/common"),
            CancellationToken::new(),
        );
        let erased = read_task.run_erased(ctx.clone(), RunMode::Run).await.unwrap();
        let logs = erased.downcast::<Vec<Arc<Log>>>().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(ctx.metadata().messages().len(), 1);
    }
}
