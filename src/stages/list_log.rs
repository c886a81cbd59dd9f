//! `ListLogEntries`: fans a query out across time-window
//! partitions, merges, and sorts ascending by timestamp.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::client::LogClient;
use crate::error::KhiError;
use crate::log::fieldset::CommonReader;
use crate::log::{FieldSetReader, Log};
use crate::task::{MessageLevel, RunMode, Task, TaskContext, TaskImplementationID, TaskLabels};

use super::FILTER_CHARACTER_LIMIT;

fn split_window(start: DateTime<Utc>, end: DateTime<Utc>, partitions: usize) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let partitions = partitions.max(1);
    let total = end - start;
    let step = total / partitions as i32;
    let mut windows = Vec::with_capacity(partitions);
    let mut cursor = start;
    for i in 0..partitions {
        let next = if i == partitions - 1 { end } else { cursor + step };
        windows.push((cursor, next));
        cursor = next;
    }
    windows
}

/// Builds the `ListLogEntries` task: in [`RunMode::DryRun`] it records the
/// generated query and returns no logs; in [`RunMode::Run`] it partitions
/// the time window, fans out to `client`, merges, and sorts ascending by
/// `Common.timestamp` (logs whose timestamp can't be read sort last; a
/// reader failure degrades to a warning rather than dropping the log).
pub fn build_list_log(
    id: TaskImplementationID<Vec<Arc<Log>>>,
    client: Arc<dyn LogClient>,
    resource_names: Vec<String>,
    filter: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    partitions: usize,
) -> Task<Vec<Arc<Log>>> {
    Task::new(
        id,
        vec![],
        TaskLabels::new("lists log entries for a time window, partitioned and merged"),
        Arc::new(move |ctx: TaskContext, mode: RunMode| {
            let client = client.clone();
            let resource_names = resource_names.clone();
            let filter = filter.clone();
            Box::pin(async move {
                if filter.len() > FILTER_CHARACTER_LIMIT {
                    ctx.metadata().record_message(
                        "list_log",
                        MessageLevel::Warning,
                        format!("filter exceeds {FILTER_CHARACTER_LIMIT} characters ({} chars)", filter.len()),
                    );
                }
                ctx.metadata().record_query(filter.clone());

                if mode.is_dry_run() {
                    return Ok(Vec::new());
                }

                let windows = split_window(start_time, end_time, partitions);
                let fetches = windows.into_iter().map(|(start, end)| {
                    let client = client.clone();
                    let resource_names = resource_names.clone();
                    let filter = filter.clone();
                    async move { client.list_entries(&resource_names, &filter, start, end).await }
                });

                let mut merged = Vec::new();
                for result in join_all(fetches).await {
                    match result {
                        Ok(logs) => merged.extend(logs),
                        Err(KhiError::Unauthorized(msg)) => {
                            ctx.metadata().record_message(
                                "list_log",
                                MessageLevel::Error,
                                format!("unauthorized: {msg}"),
                            );
                        }
                        Err(err @ (KhiError::Forbidden(_) | KhiError::UpstreamNotFound(_))) => {
                            ctx.metadata().record_message("list_log", MessageLevel::Error, err.to_string());
                        }
                        Err(err) => return Err(err),
                    }
                }

                merged.sort_by_key(|log| {
                    CommonReader
                        .read(&log.node_reader())
                        .ok()
                        .and_then(|fs| fs.as_common().ok().map(|(ts,)| *ts))
                });

                ctx.progress().set_total(merged.len() as u64);
                ctx.progress().add_completed(merged.len() as u64);
                Ok(merged)
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FixtureLogClient;
    use crate::log::Node;
    use crate::task::{ErasedTask, MessageLevel, ProgressHandle, RunMode, TaskContext};
    use crate::typed_map::TypedKeyMap;
    use chrono::TimeZone;
    use tokio_util::sync::CancellationToken;

    fn ts_node(ts: &str) -> Node {
        Node::map([("metadata".to_string(), Node::map([("timestamp".to_string(), Node::str(ts))]))])
    }

    fn fresh_ctx(task_id: &str) -> TaskContext {
        TaskContext::new(
            Arc::new(TypedKeyMap::new()),
            vec![],
            ProgressHandle::new(task_id),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn run_merges_and_sorts_ascending() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let client: Arc<dyn LogClient> = Arc::new(
            FixtureLogClient::new()
                .with_entry(t0 + chrono::Duration::minutes(90), ts_node("2024-01-01T01:30:00Z"))
                .with_entry(t0 + chrono::Duration::minutes(10), ts_node("2024-01-01T00:10:00Z")),
        );
        let task = build_list_log(
            TaskImplementationID::new("list_log/test"),
            client,
            vec![],
            "resource.type=\"k8s_container\"".to_string(),
            t0,
            t1,
            2,
        );
        let ctx = fresh_ctx("list_log/test");
        let erased = task.run_erased(ctx, RunMode::Run).await.unwrap();
        let logs = erased.downcast::<Vec<Arc<Log>>>().unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_returns_no_logs_but_records_query() {
        let client: Arc<dyn LogClient> = Arc::new(FixtureLogClient::new());
        let t0 = Utc::now();
        let task = build_list_log(
            TaskImplementationID::new("list_log/test"),
            client,
            vec![],
            "resource.type=\"x\"".to_string(),
            t0,
            t0,
            1,
        );
        let ctx = fresh_ctx("list_log/test");
        let erased = task.run_erased(ctx.clone(), RunMode::DryRun).await.unwrap();
        let logs = erased.downcast::<Vec<Arc<Log>>>().unwrap();
        assert!(logs.is_empty());
        assert_eq!(ctx.metadata().queries().len(), 1);
    }

    #[tokio::test]
    async fn unauthorized_is_recorded_and_does_not_fail_the_task() {
        let client: Arc<dyn LogClient> = Arc::new(FixtureLogClient::failing(401));
        let t0 = Utc::now();
        let task = build_list_log(
            TaskImplementationID::new("list_log/test"),
            client,
            vec![],
            "resource.type=\"x\"".to_string(),
            t0,
            t0,
            1,
        );
        let ctx = fresh_ctx("list_log/test");
        let erased = task.run_erased(ctx.clone(), RunMode::Run).await.unwrap();
        let logs = erased.downcast::<Vec<Arc<Log>>>().unwrap();
        assert!(logs.is_empty());
        let messages = ctx.metadata().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].level, MessageLevel::Error);
        assert!(messages[0].text.contains("unauthorized"));
    }

    #[tokio::test]
    async fn forbidden_and_not_found_upstream_are_recorded_not_fatal() {
        for status in [403, 404] {
            let client: Arc<dyn LogClient> = Arc::new(FixtureLogClient::failing(status));
            let t0 = Utc::now();
            let task = build_list_log(
                TaskImplementationID::new("list_log/test"),
                client,
                vec![],
                "resource.type=\"x\"".to_string(),
                t0,
                t0,
                1,
            );
            let ctx = fresh_ctx("list_log/test");
            let erased = task.run_erased(ctx.clone(), RunMode::Run).await.unwrap();
            let logs = erased.downcast::<Vec<Arc<Log>>>().unwrap();
            assert!(logs.is_empty());
            assert_eq!(ctx.metadata().messages().len(), 1);
        }
    }

    #[tokio::test]
    async fn other_transport_errors_fail_the_task() {
        let client: Arc<dyn LogClient> = Arc::new(FixtureLogClient::failing(500));
        let t0 = Utc::now();
        let task = build_list_log(
            TaskImplementationID::new("list_log/test"),
            client,
            vec![],
            "resource.type=\"x\"".to_string(),
            t0,
            t0,
            1,
        );
        let ctx = fresh_ctx("list_log/test");
        let result = task.run_erased(ctx, RunMode::Run).await;
        assert!(result.is_err());
    }
}
