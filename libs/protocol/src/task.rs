//! Task state and status reporting.

use ballast_id::{AgentId, TaskId};
use serde::{Deserialize, Serialize};

use crate::Resource;

/// Task states reported by the cluster manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Task has been submitted but not yet picked up by the agent.
    Staging,
    /// Agent is preparing the task (fetching, provisioning).
    Starting,
    /// Task is running.
    Running,
    /// Task exited successfully.
    Finished,
    /// Task exited with a failure.
    Failed,
    /// Task was killed at the scheduler's request.
    Killed,
    /// The cluster manager lost track of the task.
    Lost,
    /// Task was invalid and never ran.
    Error,
}

impl TaskState {
    /// Returns true for states the task can never leave.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Failed | Self::Killed | Self::Lost | Self::Error
        )
    }

    /// Canonical string form, used for persistence.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Killed => "killed",
            Self::Lost => "lost",
            Self::Error => "error",
        }
    }

    /// Parses the canonical string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "staging" => Some(Self::Staging),
            "starting" => Some(Self::Starting),
            "running" => Some(Self::Running),
            "finished" => Some(Self::Finished),
            "failed" => Some(Self::Failed),
            "killed" => Some(Self::Killed),
            "lost" => Some(Self::Lost),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A status report for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Task the report refers to.
    pub task_id: TaskId,

    /// Reported state.
    pub state: TaskState,

    /// Agent the task lives on.
    pub agent_id: AgentId,

    /// Report timestamp in milliseconds since the epoch.
    pub timestamp_ms: i64,

    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskStatus {
    /// Creates a status report without a message.
    #[must_use]
    pub fn new(task_id: TaskId, state: TaskState, agent_id: AgentId, timestamp_ms: i64) -> Self {
        Self {
            task_id,
            state,
            agent_id,
            timestamp_ms,
            message: None,
        }
    }

    /// Returns true if the reported state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// The payload of a launch operation: a named task plus the resources it
/// consumes from its offer. The scheduler treats the contents as opaque;
/// only the name participates in conflict and eligibility decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task name, unique within the service.
    pub name: String,

    /// Resources the task consumes.
    pub resources: Vec<Resource>,
}

impl TaskSpec {
    /// Creates a task spec.
    #[must_use]
    pub fn new(name: &str, resources: Vec<Resource>) -> Self {
        Self {
            name: name.to_string(),
            resources,
        }
    }
}
