//! Pod-instance work claims.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Names a pod instance (type + index) and the tasks a step will launch
/// on it.
///
/// Two requirements conflict iff they refer to the same pod instance;
/// whether their task sets overlap is irrelevant, since any work on an
/// instance invalidates concurrent work on the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PodInstanceRequirement {
    /// Pod type, e.g. `node` or `backup`.
    pub pod_type: String,

    /// Index of the instance within the pod type.
    pub pod_index: u32,

    /// Short task names to launch, e.g. `server`.
    pub tasks_to_launch: BTreeSet<String>,
}

impl PodInstanceRequirement {
    /// Creates a requirement for the given pod instance and tasks.
    #[must_use]
    pub fn new<I, S>(pod_type: &str, pod_index: u32, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pod_type: pod_type.to_string(),
            pod_index,
            tasks_to_launch: tasks.into_iter().map(Into::into).collect(),
        }
    }

    /// The `type-index` name of the pod instance.
    #[must_use]
    pub fn pod_instance_name(&self) -> String {
        format!("{}-{}", self.pod_type, self.pod_index)
    }

    /// Full task names, `type-index-task`.
    #[must_use]
    pub fn task_names(&self) -> Vec<String> {
        self.tasks_to_launch
            .iter()
            .map(|task| format!("{}-{}-{}", self.pod_type, self.pod_index, task))
            .collect()
    }

    /// Returns true if both requirements refer to the same pod instance.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.pod_type == other.pod_type && self.pod_index == other.pod_index
    }

    /// Returns true if this requirement conflicts with any dirty asset.
    #[must_use]
    pub fn conflicts_with_any(&self, dirty_assets: &[Self]) -> bool {
        dirty_assets.iter().any(|dirty| self.conflicts_with(dirty))
    }
}

impl std::fmt::Display for PodInstanceRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:[{}]",
            self.pod_instance_name(),
            self.tasks_to_launch
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_same_instance_different_tasks() {
        let a = PodInstanceRequirement::new("node", 0, ["server"]);
        let b = PodInstanceRequirement::new("node", 0, ["sidecar"]);
        assert!(a.conflicts_with(&b));
        assert!(b.conflicts_with(&a));
    }

    #[test]
    fn test_no_conflict_different_index() {
        let a = PodInstanceRequirement::new("node", 0, ["server"]);
        let b = PodInstanceRequirement::new("node", 1, ["server"]);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_no_conflict_different_type() {
        let a = PodInstanceRequirement::new("node", 0, ["server"]);
        let b = PodInstanceRequirement::new("backup", 0, ["server"]);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_task_names() {
        let req = PodInstanceRequirement::new("node", 2, ["server", "sidecar"]);
        let names = req.task_names();
        assert!(names.contains(&"node-2-server".to_string()));
        assert!(names.contains(&"node-2-sidecar".to_string()));
    }
}
