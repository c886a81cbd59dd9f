//! Abstract log backend.
//!
//! The core never talks to a concrete transport; [`ListLogEntries`](crate::stages::list_log)
//! is generic over anything implementing [`LogClient`]. The demonstration
//! CLI wires [`FixtureLogClient`], an in-memory stand-in, instead of a real
//! Cloud Logging client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{KhiError, KhiResult};
use crate::log::{Log, Node};

/// Talks to a log backend. Implementations must classify HTTP 401/403/404
/// into the matching [`KhiError`] variant rather than a generic transport
/// error. Logs are `Arc`-wrapped since a [`Log`]'s FieldSet cache
/// must stay the same instance as it flows through the pipeline's stages,
/// and `Task<T>` results are memoized by cloning `T`.
#[async_trait]
pub trait LogClient: Send + Sync {
    async fn list_entries(
        &self,
        resource_names: &[String],
        filter: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> KhiResult<Vec<Arc<Log>>>;
}

/// An in-memory [`LogClient`] backed by a fixed set of logs, filtered only
/// by timestamp window (it ignores `resource_names`/`filter`, which is fine
/// for local exercise: the demonstration CLI is not a conformance target).
pub struct FixtureLogClient {
    logs: Vec<FixtureEntry>,
}

struct FixtureEntry {
    timestamp: DateTime<Utc>,
    root: Node,
}

impl FixtureLogClient {
    pub fn new() -> Self {
        Self { logs: Vec::new() }
    }

    pub fn with_entry(mut self, timestamp: DateTime<Utc>, root: Node) -> Self {
        self.logs.push(FixtureEntry { timestamp, root });
        self
    }

    /// Returns a [`KhiError::Unauthorized`]-raising client, for exercising
    /// the 401/403/404 classification path without a real backend.
    pub fn failing(status: u16) -> FailingLogClient {
        FailingLogClient { status }
    }
}

impl Default for FixtureLogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogClient for FixtureLogClient {
    async fn list_entries(
        &self,
        _resource_names: &[String],
        _filter: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> KhiResult<Vec<Arc<Log>>> {
        let mut logs: Vec<Arc<Log>> = self
            .logs
            .iter()
            .filter(|entry| entry.timestamp >= start_time && entry.timestamp < end_time)
            .enumerate()
            .map(|(idx, entry)| Arc::new(Log::new(idx as u64, entry.root.clone())))
            .collect();
        logs.sort_by_key(|log| log.id());
        Ok(logs)
    }
}

/// A [`LogClient`] that always fails with a given HTTP status, for testing
/// error classification.
pub struct FailingLogClient {
    status: u16,
}

#[async_trait]
impl LogClient for FailingLogClient {
    async fn list_entries(
        &self,
        _resource_names: &[String],
        _filter: &str,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
    ) -> KhiResult<Vec<Arc<Log>>> {
        Err(KhiError::from_http_status(self.status, "fixture failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn fixture_client_filters_by_time_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let client = FixtureLogClient::new()
            .with_entry(t0, Node::map(Vec::<(String, Node)>::new()))
            .with_entry(t2, Node::map(Vec::<(String, Node)>::new()));

        let logs = client.list_entries(&[], "", t0, t1).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn failing_client_classifies_status() {
        let client = FixtureLogClient::failing(403);
        let err = client
            .list_entries(&[], "", Utc::now(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, KhiError::Forbidden(_)));
    }
}
