//! Per-log scratchpad of timeline mutations.
//!
//! A `ChangeSet` is owned by exactly one [`crate::task::Task`] invocation of
//! a `LogToTimelineMapper` fold step; it is consumed by [`crate::history::HistoryBuilder::merge`]
//! and never touched concurrently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::parser::Severity;

/// The kind of state transition a [`Revision`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Delete,
    Ready,
    NonReady,
    Update,
}

/// A typed state transition on a resource at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub verb: Verb,
    pub state: String,
    pub requestor: String,
    pub change_time: DateTime<Utc>,
    pub partial: bool,
}

/// A single timeline event attached to a resource path.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub summary: String,
}

/// Accumulates events, revisions, and a summary for one log as it is
/// mapped. Resource paths follow the glossary convention
/// `core/v1#kind#namespace#name[#subresource]`.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    events: Vec<(String, Event)>,
    revisions: Vec<(String, Revision)>,
    summary: Option<String>,
    summary_replacements: HashMap<String, String>,
    severity_override: Option<Severity>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, resource_path: impl Into<String>, time: DateTime<Utc>, summary: impl Into<String>) {
        self.events.push((
            resource_path.into(),
            Event { time, summary: summary.into() },
        ));
    }

    pub fn add_revision(&mut self, resource_path: impl Into<String>, revision: Revision) {
        self.revisions.push((resource_path.into(), revision));
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    /// Registers a raw correlation ID (sandbox ID, container ID) found in
    /// this log's message to be rewritten to a human-readable name wherever
    /// it appears in the rendered summary.
    pub fn add_summary_replacement(&mut self, id: impl Into<String>, human_name: impl Into<String>) {
        self.summary_replacements.insert(id.into(), human_name.into());
    }

    pub fn set_severity_override(&mut self, severity: Severity) {
        self.severity_override = Some(severity);
    }

    pub fn events(&self) -> &[(String, Event)] {
        &self.events
    }

    pub fn revisions(&self) -> &[(String, Revision)] {
        &self.revisions
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn summary_replacements(&self) -> &HashMap<String, String> {
        &self.summary_replacements
    }

    /// Renders the stored summary with every registered ID substituted
    /// for its human-readable name, or `None` if no summary was set.
    pub fn render_summary(&self) -> Option<String> {
        self.summary.as_ref().map(|summary| {
            let mut rendered = summary.clone();
            for (id, human_name) in &self.summary_replacements {
                rendered = rendered.replace(id.as_str(), human_name);
            }
            rendered
        })
    }

    pub fn severity_override(&self) -> Option<Severity> {
        self.severity_override
    }
}
