//! Process-wide accumulator across all mappers for one inspection run.
//!
//! `merge` is the only mutator; it is serialized per resource-path bucket so
//! revisions on the same resource are totally ordered by `change_time`
//! while unrelated resource paths merge concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::changeset::{ChangeSet, Event, Revision};
use crate::identity_cache::ClusterIdentityCache;

/// The accumulated timeline for one resource path.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub events: Vec<Event>,
    pub revisions: Vec<Revision>,
}

impl Timeline {
    fn insert_revision(&mut self, revision: Revision) {
        let pos = self
            .revisions
            .binary_search_by(|existing| existing.change_time.cmp(&revision.change_time))
            .unwrap_or_else(|pos| pos);
        self.revisions.insert(pos, revision);
    }
}

/// Snapshot of a run's accumulated state, handed back to the caller after
/// `Run` completes.
pub struct HistorySnapshot {
    pub timelines: HashMap<String, Timeline>,
}

/// Owns per-resource-path timelines plus the [`ClusterIdentityCache`] shared
/// by parsers and mappers across the whole run.
pub struct HistoryBuilder {
    buckets: RwLock<HashMap<String, Arc<Mutex<Timeline>>>>,
    pub identity_cache: ClusterIdentityCache,
}

impl HistoryBuilder {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            identity_cache: ClusterIdentityCache::new(),
        }
    }

    fn bucket(&self, resource_path: &str) -> Arc<Mutex<Timeline>> {
        {
            let buckets = self.buckets.read().expect("history buckets poisoned");
            if let Some(bucket) = buckets.get(resource_path) {
                return bucket.clone();
            }
        }
        let mut buckets = self.buckets.write().expect("history buckets poisoned");
        buckets
            .entry(resource_path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Timeline::default())))
            .clone()
    }

    /// Merges one log's [`ChangeSet`] into the accumulated history. Events
    /// and revisions are routed by their resource path; revisions keep the
    /// bucket's list ordered by `change_time`.
    pub fn merge(&self, changeset: ChangeSet) {
        for (resource_path, event) in changeset.events() {
            let bucket = self.bucket(resource_path);
            let mut timeline = bucket.lock().expect("history bucket poisoned");
            timeline.events.push(event.clone());
        }
        for (resource_path, revision) in changeset.revisions() {
            let bucket = self.bucket(resource_path);
            let mut timeline = bucket.lock().expect("history bucket poisoned");
            timeline.insert_revision(revision.clone());
        }
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let buckets = self.buckets.read().expect("history buckets poisoned");
        let timelines = buckets
            .iter()
            .map(|(path, bucket)| (path.clone(), bucket.lock().expect("history bucket poisoned").clone()))
            .collect();
        HistorySnapshot { timelines }
    }
}

impl Default for HistoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::Verb;
    use chrono::{TimeZone, Utc};

    fn revision_at(hour: u32, verb: Verb) -> Revision {
        Revision {
            verb,
            state: "state".into(),
            requestor: "kubelet".into(),
            change_time: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            partial: false,
        }
    }

    #[test]
    fn revisions_stay_ordered_by_change_time_across_merges() {
        let builder = HistoryBuilder::new();

        let mut later = ChangeSet::new();
        later.add_revision("core/v1#pod#ns#a", revision_at(5, Verb::Ready));
        builder.merge(later);

        let mut earlier = ChangeSet::new();
        earlier.add_revision("core/v1#pod#ns#a", revision_at(1, Verb::Create));
        builder.merge(earlier);

        let snapshot = builder.snapshot();
        let timeline = &snapshot.timelines["core/v1#pod#ns#a"];
        assert_eq!(timeline.revisions[0].verb, Verb::Create);
        assert_eq!(timeline.revisions[1].verb, Verb::Ready);
    }

    #[test]
    fn distinct_resource_paths_do_not_interfere() {
        let builder = HistoryBuilder::new();
        let mut cs = ChangeSet::new();
        cs.add_revision("core/v1#pod#ns#a", revision_at(1, Verb::Create));
        cs.add_revision("core/v1#pod#ns#b", revision_at(2, Verb::Create));
        builder.merge(cs);

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.timelines.len(), 2);
    }
}
