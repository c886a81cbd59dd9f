//! Cluster-identity cache: resource-lease indices parsers and mappers query
//! to resolve opaque identifiers at a point in time.
//!
//! Each index is an append-mostly list of `(lease, valid_from, valid_until)`
//! tuples per key. A writer appends a new lease, closing the previous
//! lease's `valid_until` if one was open; a reader does an interval search
//! over the sorted list for "who held this key at timestamp T". Concurrency
//! matches [`crate::typed_map`]: per-key locking, lock-free across keys.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

/// One resource's ownership of a key for `[valid_from, valid_until)`. An
/// open-ended lease (`valid_until == None`) is the currently active holder.
#[derive(Debug, Clone, PartialEq)]
pub struct Lease<V> {
    pub holder: V,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// A single pod identity, as held by a NEG lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodIdentity {
    pub namespace: String,
    pub pod: String,
}

/// Whatever currently holds an IP: a pod or a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpHolder {
    Pod { namespace: String, pod: String },
    Node { name: String },
}

/// A per-key, append-mostly interval index. Generic over the lease payload
/// so [`ClusterIdentityCache`] can reuse it for both the NEG and IP maps.
pub struct LeaseIndex<V> {
    keys: RwLock<HashMap<String, Arc<Mutex<Vec<Lease<V>>>>>>,
}

impl<V: Clone> LeaseIndex<V> {
    pub fn new() -> Self {
        Self { keys: RwLock::new(HashMap::new()) }
    }

    fn bucket(&self, key: &str) -> Arc<Mutex<Vec<Lease<V>>>> {
        {
            let keys = self.keys.read().expect("lease index keys poisoned");
            if let Some(bucket) = keys.get(key) {
                return bucket.clone();
            }
        }
        let mut keys = self.keys.write().expect("lease index keys poisoned");
        keys.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }

    /// Appends a new open-ended lease for `key`, closing the prior
    /// open-ended lease (if any) at `valid_from`.
    pub fn append(&self, key: &str, holder: V, valid_from: DateTime<Utc>) {
        let bucket = self.bucket(key);
        let mut leases = bucket.lock().expect("lease bucket poisoned");
        if let Some(last) = leases.last_mut() {
            if last.valid_until.is_none() {
                last.valid_until = Some(valid_from);
            }
        }
        leases.push(Lease { holder, valid_from, valid_until: None });
    }

    /// Returns the holder of `key` at `at`, via interval search over the
    /// sorted-by-`valid_from` lease list.
    pub fn at(&self, key: &str, at: DateTime<Utc>) -> Option<V> {
        let bucket = self.bucket(key);
        let leases = bucket.lock().expect("lease bucket poisoned");
        leases
            .iter()
            .rev()
            .find(|lease| lease.valid_from <= at && lease.valid_until.map_or(true, |until| at < until))
            .map(|lease| lease.holder.clone())
    }
}

impl<V: Clone> Default for LeaseIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The two lease maps the pipeline core needs: network endpoint
/// group membership and IP address ownership.
#[derive(Default)]
pub struct ClusterIdentityCache {
    pub neg: LeaseIndex<PodIdentity>,
    pub ip: LeaseIndex<IpHolder>,
}

impl ClusterIdentityCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn at_returns_holder_valid_at_timestamp() {
        let index: LeaseIndex<PodIdentity> = LeaseIndex::new();
        index.append("neg-1", PodIdentity { namespace: "ns".into(), pod: "a".into() }, t(0));
        index.append("neg-1", PodIdentity { namespace: "ns".into(), pod: "b".into() }, t(5));

        let holder = index.at("neg-1", t(3)).unwrap();
        assert_eq!(holder.pod, "a");
        let holder = index.at("neg-1", t(6)).unwrap();
        assert_eq!(holder.pod, "b");
    }

    #[test]
    fn at_before_first_lease_is_none() {
        let index: LeaseIndex<IpHolder> = LeaseIndex::new();
        index.append("10.0.0.1", IpHolder::Node { name: "node-a".into() }, t(5));
        assert!(index.at("10.0.0.1", t(1)).is_none());
    }

    #[test]
    fn unknown_key_is_none() {
        let index: LeaseIndex<PodIdentity> = LeaseIndex::new();
        assert!(index.at("missing", t(0)).is_none());
    }
}
