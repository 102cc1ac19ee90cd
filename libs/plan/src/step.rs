//! Steps: the smallest unit of plan work.

use std::collections::HashSet;
use std::sync::RwLock;

use ballast_id::ResourceId;
use ballast_protocol::TaskState;
use tracing::{debug, info};

use crate::{Element, PodInstanceRequirement, Status};

/// The state a step's tasks must reach for the step to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalState {
    /// The task should come up and stay running (services).
    Running,
    /// The task should run to successful completion (batch work).
    Finished,
}

/// The smallest unit of plan work.
///
/// A step claims a pod instance via its [`PodInstanceRequirement`], hands
/// that requirement to the offer evaluation when started, and advances
/// through its lifecycle as task status reports arrive.
pub struct Step {
    name: String,
    status: RwLock<Status>,
    errors: RwLock<Vec<String>>,
    requirement: Option<PodInstanceRequirement>,
    goal: GoalState,
    /// Set for resource-cleanup steps only.
    resource_id: Option<ResourceId>,
}

impl Step {
    /// Creates a pending step for the given requirement.
    #[must_use]
    pub fn new(name: &str, requirement: Option<PodInstanceRequirement>) -> Self {
        Self::with_status(name, requirement, Status::Pending)
    }

    /// Creates a step with an explicit initial status.
    #[must_use]
    pub fn with_status(
        name: &str,
        requirement: Option<PodInstanceRequirement>,
        status: Status,
    ) -> Self {
        Self {
            name: name.to_string(),
            status: RwLock::new(status),
            errors: RwLock::new(Vec::new()),
            requirement,
            goal: GoalState::Running,
            resource_id: None,
        }
    }

    /// Creates a step whose tasks must run to completion.
    #[must_use]
    pub fn with_goal(mut self, goal: GoalState) -> Self {
        self.goal = goal;
        self
    }

    /// Creates a step that uninstalls one reserved resource.
    ///
    /// The step name carries the `unreserve-` prefix so it is never a bare
    /// resource id. It completes when [`Step::update_resource_status`] is
    /// told the resource has been unreserved.
    #[must_use]
    pub fn resource_cleanup(resource_id: ResourceId, status: Status) -> Self {
        Self {
            name: format!("unreserve-{resource_id}"),
            status: RwLock::new(status),
            errors: RwLock::new(Vec::new()),
            requirement: None,
            goal: GoalState::Finished,
            resource_id: Some(resource_id),
        }
    }

    /// The step's pod-instance requirement, if it launches tasks.
    #[must_use]
    pub fn requirement(&self) -> Option<&PodInstanceRequirement> {
        self.requirement.as_ref()
    }

    /// Overwrites the step status.
    pub fn set_status(&self, status: Status) {
        let mut guard = self.status.write().unwrap();
        if *guard != status {
            debug!(step = %self.name, from = %*guard, to = %status, "Step status changed");
            *guard = status;
        }
    }

    /// Records a permanent failure on this step.
    pub fn record_error(&self, message: &str) {
        self.errors.write().unwrap().push(message.to_string());
        self.set_status(Status::Error);
    }

    /// Claims the step's work, moving a pending step to prepared.
    ///
    /// Returns the requirement the offer evaluation should satisfy.
    pub fn start(&self) -> Option<PodInstanceRequirement> {
        if self.status() == Status::Pending {
            info!(step = %self.name, "Setting step to prepared");
            self.set_status(Status::Prepared);
        }
        self.requirement.clone()
    }

    /// Resets the step to pending so it is re-attempted.
    pub fn restart(&self) {
        self.set_status(Status::Pending);
    }

    /// Advances the step lifecycle from a task status report.
    ///
    /// `task_name` is the full `type-index-task` name; reports for tasks
    /// this step did not launch are ignored.
    pub fn handle_task_status(&self, task_name: &str, state: TaskState) {
        let Some(requirement) = &self.requirement else {
            return;
        };
        if !requirement.task_names().iter().any(|n| n == task_name) {
            return;
        }

        match state {
            TaskState::Staging | TaskState::Starting => self.set_status(Status::Starting),
            TaskState::Running => match self.goal {
                GoalState::Running => self.set_status(Status::Complete),
                GoalState::Finished => self.set_status(Status::Started),
            },
            TaskState::Finished => match self.goal {
                GoalState::Finished => self.set_status(Status::Complete),
                GoalState::Running => {
                    self.record_error(&format!("task {task_name} exited while goal is running"));
                }
            },
            TaskState::Failed | TaskState::Killed | TaskState::Lost | TaskState::Error => {
                self.record_error(&format!("task {task_name} reached {}", state.as_str()));
            }
        }
    }

    /// Notifies a cleanup step that resource ids have been unreserved.
    pub fn update_resource_status(&self, unreserved: &HashSet<ResourceId>) {
        if let Some(resource_id) = &self.resource_id {
            if unreserved.contains(resource_id) {
                info!(step = %self.name, resource_id = %resource_id, "Resource dereservation complete");
                self.set_status(Status::Complete);
            }
        }
    }

    /// Returns true if the step has claimed work and awaits resources.
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.status() == Status::Prepared
    }

    /// Returns true if the cluster manager is bringing the work up.
    #[must_use]
    pub fn is_starting(&self) -> bool {
        self.status() == Status::Starting
    }
}

impl Element for Step {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        *self.status.read().unwrap()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.read().unwrap().clone()
    }

    fn is_eligible(&self, dirty_assets: &[PodInstanceRequirement]) -> bool {
        if self.is_complete() || self.has_errors() {
            return false;
        }
        match &self.requirement {
            Some(requirement) => !requirement.conflicts_with_any(dirty_assets),
            None => true,
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> Step {
        Step::new(
            "node-0",
            Some(PodInstanceRequirement::new("node", 0, ["server"])),
        )
    }

    #[test]
    fn test_start_moves_pending_to_prepared() {
        let s = step();
        assert_eq!(s.status(), Status::Pending);
        let requirement = s.start();
        assert_eq!(s.status(), Status::Prepared);
        assert_eq!(requirement.unwrap().pod_instance_name(), "node-0");
    }

    #[test]
    fn test_start_is_idempotent_once_past_pending() {
        let s = step();
        s.set_status(Status::Starting);
        s.start();
        assert_eq!(s.status(), Status::Starting);
    }

    #[test]
    fn test_task_status_drives_lifecycle() {
        let s = step();
        s.start();
        s.handle_task_status("node-0-server", TaskState::Staging);
        assert_eq!(s.status(), Status::Starting);
        s.handle_task_status("node-0-server", TaskState::Running);
        assert_eq!(s.status(), Status::Complete);
    }

    #[test]
    fn test_finished_goal_passes_through_started() {
        let s = step().with_goal(GoalState::Finished);
        s.start();
        s.handle_task_status("node-0-server", TaskState::Running);
        assert_eq!(s.status(), Status::Started);
        s.handle_task_status("node-0-server", TaskState::Finished);
        assert_eq!(s.status(), Status::Complete);
    }

    #[test]
    fn test_unrelated_task_is_ignored() {
        let s = step();
        s.start();
        s.handle_task_status("node-1-server", TaskState::Running);
        assert_eq!(s.status(), Status::Prepared);
    }

    #[test]
    fn test_failure_records_error() {
        let s = step();
        s.start();
        s.handle_task_status("node-0-server", TaskState::Failed);
        assert_eq!(s.status(), Status::Error);
        assert!(!s.errors().is_empty());
        assert!(!s.is_eligible(&[]));
    }

    #[test]
    fn test_eligibility_respects_dirty_assets() {
        let s = step();
        let dirty = vec![PodInstanceRequirement::new("node", 0, ["sidecar"])];
        assert!(!s.is_eligible(&dirty));

        let other = vec![PodInstanceRequirement::new("node", 1, ["server"])];
        assert!(s.is_eligible(&other));
    }

    #[test]
    fn test_complete_step_never_eligible() {
        let s = step();
        s.set_status(Status::Complete);
        assert!(!s.is_eligible(&[]));
    }

    #[test]
    fn test_resource_cleanup_step() {
        let resource_id: ResourceId = "res-7".parse().unwrap();
        let s = Step::resource_cleanup(resource_id.clone(), Status::Pending);
        assert_eq!(s.name(), "unreserve-res-7");

        s.update_resource_status(&HashSet::from(["res-other".parse().unwrap()]));
        assert_eq!(s.status(), Status::Pending);

        s.update_resource_status(&HashSet::from([resource_id]));
        assert_eq!(s.status(), Status::Complete);
    }
}
