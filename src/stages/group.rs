//! `LogGrouper`: buckets logs by a pure key function, preserving input
//! order within each bucket.

use std::collections::HashMap;
use std::sync::Arc;

use crate::log::Log;
use crate::task::{RunMode, Task, TaskContext, TaskImplementationID, TaskLabels, TaskReference};

/// `groupKey(string) -> ordered logs`. No duplicate log IDs within a group
///; order within a group is input order (ascending
/// timestamp, if the input was already sorted by `ListLogEntries`).
#[derive(Debug, Clone, Default)]
pub struct LogGroupMap {
    groups: HashMap<String, Vec<Arc<Log>>>,
}

impl LogGroupMap {
    pub fn from_groups(groups: HashMap<String, Vec<Arc<Log>>>) -> Self {
        Self { groups }
    }

    pub fn get(&self, key: &str) -> Option<&[Arc<Log>]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Arc<Log>>)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

/// How a grouper assigns the bucket key when its `keyFn` is not otherwise
/// driven by log content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    /// A single constant key: every log lands in one bucket.
    AllDependent,
    /// The log's own ID is the key: every log is its own bucket.
    AllIndependent,
    /// `key_fn` decides the bucket per log.
    ByKeyFn,
}

/// Builds a `LogGrouper` task. `key_fn` is used when `policy` is
/// [`GroupPolicy::ByKeyFn`]; an empty key routes to the `""` bucket.
/// For `AllDependent`/`AllIndependent`, `key_fn` is ignored.
pub fn build_grouper(
    id: TaskImplementationID<LogGroupMap>,
    logs: TaskReference<Vec<Arc<Log>>>,
    policy: GroupPolicy,
    key_fn: Arc<dyn Fn(&Log) -> String + Send + Sync>,
) -> Task<LogGroupMap> {
    let deps = vec![logs.untyped()];
    Task::new(
        id,
        deps,
        TaskLabels::new("groups a log list by key, preserving input order within each group"),
        Arc::new(move |ctx: TaskContext, _mode: RunMode| {
            let logs = logs.clone();
            let key_fn = key_fn.clone();
            Box::pin(async move {
                let input = ctx.get_result(&logs);
                let mut groups: HashMap<String, Vec<Arc<Log>>> = HashMap::new();
                for log in input {
                    let key = match policy {
                        GroupPolicy::AllDependent => String::new(),
                        GroupPolicy::AllIndependent => log.id().to_string(),
                        GroupPolicy::ByKeyFn => key_fn(&log),
                    };
                    groups.entry(key).or_default().push(log);
                }
                Ok(LogGroupMap { groups })
            })
        }),
    )
}
