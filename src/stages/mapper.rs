//! `LogToTimelineMapper<S>`: per-group sequential fold over an
//! internal state `S`, producing `ChangeSet` mutations merged into the
//! shared `HistoryBuilder`. Groups are processed in parallel with one other;
//! within a group, processing is strictly sequential).

use std::sync::Arc;

use futures::future::join_all;

use crate::changeset::ChangeSet;
use crate::history::HistoryBuilder;
use crate::log::Log;
use crate::task::{RunMode, Task, TaskContext, TaskImplementationID, TaskLabels, TaskReference};

use super::group::LogGroupMap;

/// Builds a `LogToTimelineMapper` task. `fold` is called once per log, in
/// timestamp order within its group, threading the mapper's state `S`
/// across calls and returning the `ChangeSet` mutation for that log; the
/// mapper merges it into `history` immediately so mutations on the same
/// resource path stay ordered per the HistoryBuilder's own serialization
///). The task's result is the final per-group state, one entry
/// per group, in group-iteration order.
pub fn build_timeline_mapper<S>(
    id: TaskImplementationID<Vec<S>>,
    groups: TaskReference<LogGroupMap>,
    history: Arc<HistoryBuilder>,
    initial_state: Arc<dyn Fn() -> S + Send + Sync>,
    fold: Arc<dyn Fn(&mut S, &Arc<Log>) -> ChangeSet + Send + Sync>,
) -> Task<Vec<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let deps = vec![groups.untyped()];
    Task::new(
        id,
        deps,
        TaskLabels::new("folds per-group log sequences into timeline ChangeSets"),
        Arc::new(move |ctx: TaskContext, _mode: RunMode| {
            let groups = groups.clone();
            let history = history.clone();
            let initial_state = initial_state.clone();
            let fold = fold.clone();
            Box::pin(async move {
                let group_map = ctx.get_result(&groups);
                ctx.progress().set_total(group_map.len() as u64);

                let tasks = group_map.iter().map(|(_key, logs)| {
                    let history = history.clone();
                    let initial_state = initial_state.clone();
                    let fold = fold.clone();
                    let logs = logs.clone();
                    let progress = ctx.progress().clone();
                    async move {
                        let mut state = initial_state();
                        for log in &logs {
                            let changeset = fold(&mut state, log);
                            history.merge(changeset);
                        }
                        progress.add_completed(1);
                        state
                    }
                });

                Ok(join_all(tasks).await)
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::{ChangeSet, Revision, Verb};
    use crate::log::Node;
    use crate::task::{ErasedTask, ProgressHandle, TaskReference};
    use crate::typed_map::TypedKeyMap;
    use chrono::{TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    fn group_map_with_two_logs() -> LogGroupMap {
        let mut groups = std::collections::HashMap::new();
        groups.insert(
            "pod-a".to_string(),
            vec![
                Arc::new(Log::new(1, Node::map(Vec::<(String, Node)>::new()))),
                Arc::new(Log::new(2, Node::map(Vec::<(String, Node)>::new()))),
            ],
        );
        LogGroupMap::from_groups(groups)
    }

    #[tokio::test]
    async fn mapper_merges_one_changeset_per_log_into_history() {
        let history = Arc::new(HistoryBuilder::new());
        let groups = group_map_with_two_logs();

        let results = Arc::new(TypedKeyMap::new());
        results.set("groups", groups);
        let groups_ref: TaskReference<LogGroupMap> = TaskReference::new(TaskImplementationID::new("groups"));

        let task = build_timeline_mapper::<u32>(
            TaskImplementationID::new("mapper"),
            groups_ref.clone(),
            history.clone(),
            Arc::new(|| 0u32),
            Arc::new(|state, log| {
                *state += 1;
                let mut cs = ChangeSet::new();
                cs.add_revision(
                    "core/v1#pod#ns#a",
                    Revision {
                        verb: Verb::Update,
                        state: "seen".into(),
                        requestor: "mapper".into(),
                        change_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, log.id() as u32).unwrap(),
                        partial: false,
                    },
                );
                cs
            }),
        );

        let ctx = TaskContext::new(results, vec![groups_ref.untyped()], ProgressHandle::new("mapper"), CancellationToken::new());
        let erased = task.run_erased(ctx, RunMode::Run).await.unwrap();
        let states = erased.downcast::<Vec<u32>>().unwrap();
        assert_eq!(*states, vec![2]);

        let snapshot = history.snapshot();
        assert_eq!(snapshot.timelines["core/v1#pod#ns#a"].revisions.len(), 2);
    }
}
