//! Feature registration surface.
//!
//! Each top-level feature declares itself once at startup with a
//! [`FeatureTaskLabel`] and the [`crate::task::TaskReference`] of its
//! `Tail` task, the task the feature actually asks the engine to run.

use crate::task::{TaskReference, UntypedTaskReference};

/// Declarative metadata for one feature module.
#[derive(Debug, Clone)]
pub struct FeatureTaskLabel {
    pub name: String,
    pub description: String,
    pub default_log_type: String,
    pub priority: i32,
    pub readonly: bool,
    pub inspection_types: Vec<String>,
}

impl FeatureTaskLabel {
    pub fn new(name: impl Into<String>, description: impl Into<String>, default_log_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default_log_type: default_log_type.into(),
            priority: 0,
            readonly: true,
            inspection_types: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn with_inspection_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inspection_types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// One feature's registered entry: its label plus the tail task it asks the
/// caller to run.
pub struct FeatureRegistration {
    pub label: FeatureTaskLabel,
    pub tail: UntypedTaskReference,
}

impl FeatureRegistration {
    pub fn new<T>(label: FeatureTaskLabel, tail: &TaskReference<T>) -> Self {
        Self { label, tail: tail.untyped() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskImplementationID;

    #[test]
    fn registration_captures_tail_reference() {
        let label = FeatureTaskLabel::new("k8s-node-logs", "Kubernetes node logs", "node")
            .with_priority(10)
            .with_inspection_types(["cluster"]);
        let tail: TaskReference<()> = TaskReference::new(TaskImplementationID::new("tail/node"));
        let registration = FeatureRegistration::new(label, &tail);
        assert_eq!(registration.tail.id(), "tail/node");
        assert_eq!(registration.label.priority, 10);
    }
}
