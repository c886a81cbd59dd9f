//! Collects tasks by ID, rejecting duplicates before a [`super::Plan`] is
//! ever built from them.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::ErasedTask;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate task id '{0}'")]
    DuplicateId(String),
}

/// A flat collection of tasks, keyed by ID. Tasks are added once at
/// startup; a `Registry` never removes entries.
#[derive(Default)]
pub struct Registry {
    tasks: HashMap<String, Arc<dyn ErasedTask>>,
}

impl Registry {
    pub fn new() -> Self {
        Self { tasks: HashMap::new() }
    }

    pub fn register(&mut self, task: Arc<dyn ErasedTask>) -> Result<(), RegistryError> {
        let id = task.id().to_string();
        if self.tasks.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        self.tasks.insert(id, task);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn ErasedTask>> {
        self.tasks.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ErasedTask>> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
