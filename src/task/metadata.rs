//! Run-wide metadata accumulated across all tasks in one execution: the
//! queries a `DryRun`/`Run` actually issued and the warning/error messages
//! recorded against the run.

use std::sync::{Arc, Mutex};

/// Severity of a recorded run message. A `Warning` never fails the owning
/// task (e.g. a per-log reader failure); an `Error` is recorded alongside
/// a task failure for the caller to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct RunMessage {
    pub task_id: String,
    pub level: MessageLevel,
    pub text: String,
}

#[derive(Default)]
struct Inner {
    queries: Vec<String>,
    messages: Vec<RunMessage>,
}

/// Shared, append-only log of what a run did, independent of any one
/// task's typed result.
#[derive(Clone, Default)]
pub struct RunMetadata {
    inner: Arc<Mutex<Inner>>,
}

impl RunMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self, query: impl Into<String>) {
        self.inner.lock().expect("run metadata poisoned").queries.push(query.into());
    }

    pub fn record_message(&self, task_id: impl Into<String>, level: MessageLevel, text: impl Into<String>) {
        self.inner.lock().expect("run metadata poisoned").messages.push(RunMessage {
            task_id: task_id.into(),
            level,
            text: text.into(),
        });
    }

    pub fn queries(&self) -> Vec<String> {
        self.inner.lock().expect("run metadata poisoned").queries.clone()
    }

    pub fn messages(&self) -> Vec<RunMessage> {
        self.inner.lock().expect("run metadata poisoned").messages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_queries_and_messages_independently() {
        let metadata = RunMetadata::new();
        metadata.record_query("resource.type=\"k8s_container\"");
        metadata.record_message("list_log", MessageLevel::Warning, "filter exceeds 20000 chars");
        assert_eq!(metadata.queries().len(), 1);
        assert_eq!(metadata.messages().len(), 1);
    }
}
