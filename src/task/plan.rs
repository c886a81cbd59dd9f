//! Builds an executable `Plan` from a [`super::Registry`] plus a set of
//! requested root tasks: the transitive dependency closure, checked for
//! missing dependencies and cycles, in a topological run order.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::{ErasedTask, Registry, UntypedTaskReference};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("task '{0}' depends on unregistered task '{1}'")]
    MissingDependency(String, String),
    #[error("dependency cycle detected: {0}")]
    Cycle(String),
}

/// An ordered, closed set of tasks ready to execute: every dependency of
/// every included task is itself included, and tasks are ordered so each
/// one's dependencies appear before it.
pub struct Plan {
    order: Vec<String>,
}

impl Plan {
    /// Computes the transitive closure of `roots` over `registry` and
    /// topologically sorts it. `roots` order does not affect correctness,
    /// only which ties in the sort break first.
    pub fn build(registry: &Registry, roots: &[UntypedTaskReference]) -> Result<Self, PlanError> {
        let mut closure: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = roots.iter().map(|r| r.id().to_string()).collect();

        while let Some(id) = stack.pop() {
            if !closure.insert(id.clone()) {
                continue;
            }
            let task = registry
                .get(&id)
                .ok_or_else(|| PlanError::MissingDependency(id.clone(), id.clone()))?;
            for dep in task.dependencies() {
                if registry.get(dep.id()).is_none() {
                    return Err(PlanError::MissingDependency(id.clone(), dep.id().to_string()));
                }
                stack.push(dep.id().to_string());
            }
        }

        let order = topological_order(registry, &closure)?;
        Ok(Self { order })
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn topological_order(registry: &Registry, closure: &HashSet<String>) -> Result<Vec<String>, PlanError> {
    let mut order = Vec::with_capacity(closure.len());
    let mut marks: HashMap<String, Mark> = HashMap::new();

    let mut ids: Vec<&String> = closure.iter().collect();
    ids.sort();

    for id in ids {
        visit(registry, id, &mut marks, &mut order, &mut Vec::new())?;
    }
    Ok(order)
}

fn visit(
    registry: &Registry,
    id: &str,
    marks: &mut HashMap<String, Mark>,
    order: &mut Vec<String>,
    path: &mut Vec<String>,
) -> Result<(), PlanError> {
    match marks.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            path.push(id.to_string());
            return Err(PlanError::Cycle(path.join(" -> ")));
        }
        None => {}
    }

    marks.insert(id.to_string(), Mark::Visiting);
    path.push(id.to_string());

    let task = registry.get(id).expect("closure only contains registered ids");
    for dep in task.dependencies() {
        visit(registry, dep.id(), marks, order, path)?;
    }

    path.pop();
    marks.insert(id.to_string(), Mark::Done);
    order.push(id.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskImplementationID, TaskLabels};
    use std::sync::Arc;

    fn task_with_deps(id: &str, deps: &[&str]) -> Arc<dyn ErasedTask> {
        let deps = deps.iter().map(|d| UntypedTaskReference::new(*d)).collect();
        Arc::new(Task::new(
            TaskImplementationID::<i64>::new(id),
            deps,
            TaskLabels::new("test"),
            Arc::new(|_ctx, _mode| Box::pin(async { Ok(0) })),
        ))
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let mut registry = Registry::new();
        registry.register(task_with_deps("a", &[])).unwrap();
        registry.register(task_with_deps("b", &["a"])).unwrap();
        registry.register(task_with_deps("c", &["b"])).unwrap();

        let plan = Plan::build(&registry, &[UntypedTaskReference::new("c")]).unwrap();
        let pos = |id: &str| plan.order().iter().position(|x| x == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let mut registry = Registry::new();
        registry.register(task_with_deps("a", &["ghost"])).unwrap();
        let err = Plan::build(&registry, &[UntypedTaskReference::new("a")]).unwrap_err();
        assert!(matches!(err, PlanError::MissingDependency(_, dep) if dep == "ghost"));
    }

    #[test]
    fn cycle_is_detected() {
        let mut registry = Registry::new();
        registry.register(task_with_deps("a", &["b"])).unwrap();
        registry.register(task_with_deps("b", &["a"])).unwrap();
        let err = Plan::build(&registry, &[UntypedTaskReference::new("a")]).unwrap_err();
        assert!(matches!(err, PlanError::Cycle(_)));
    }

    #[test]
    fn diamond_dependency_is_included_once() {
        let mut registry = Registry::new();
        registry.register(task_with_deps("a", &[])).unwrap();
        registry.register(task_with_deps("b", &["a"])).unwrap();
        registry.register(task_with_deps("c", &["a"])).unwrap();
        registry.register(task_with_deps("d", &["b", "c"])).unwrap();

        let plan = Plan::build(&registry, &[UntypedTaskReference::new("d")]).unwrap();
        assert_eq!(plan.len(), 4);
        let pos = |id: &str| plan.order().iter().position(|x| x == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }
}
