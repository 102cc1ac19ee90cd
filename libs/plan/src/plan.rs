//! Plans: the root of the work tree.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::{aggregate_status, Element, Phase, PodInstanceRequirement, Status, Step, Strategy};

/// An ordered collection of phases advancing under one strategy.
///
/// A plan can be interrupted by an operator; an interrupted plan selects
/// no work and reports `WAITING` until it is told to proceed.
pub struct Plan {
    name: String,
    phases: Vec<Arc<Phase>>,
    strategy: Arc<dyn Strategy<Phase>>,
    errors: RwLock<Vec<String>>,
    interrupted: AtomicBool,
}

impl Plan {
    /// Creates a plan over the provided phases.
    #[must_use]
    pub fn new(name: &str, phases: Vec<Phase>, strategy: Arc<dyn Strategy<Phase>>) -> Self {
        Self {
            name: name.to_string(),
            phases: phases.into_iter().map(Arc::new).collect(),
            strategy,
            errors: RwLock::new(Vec::new()),
            interrupted: AtomicBool::new(false),
        }
    }

    /// Attaches validation errors discovered after construction.
    pub fn record_error(&self, message: &str) {
        self.errors.write().unwrap().push(message.to_string());
    }

    /// The plan's phases, in declared order.
    #[must_use]
    pub fn phases(&self) -> &[Arc<Phase>] {
        &self.phases
    }

    /// Pauses work selection on this plan.
    pub fn interrupt(&self) {
        info!(plan = %self.name, "Plan interrupted");
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Resumes work selection on this plan.
    pub fn proceed(&self) {
        info!(plan = %self.name, "Plan proceeding");
        self.interrupted.store(false, Ordering::SeqCst);
    }

    /// Returns true while the plan is interrupted.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Whether the plan has any work left to do.
    ///
    /// A plan in error can still have operations: errors do not stop it
    /// from reaching for its target configuration. Only full completion
    /// or an interruption stops work.
    #[must_use]
    pub fn has_operations(&self) -> bool {
        let complete = self.phases.iter().all(|phase| phase.is_complete());
        !complete && !self.is_interrupted()
    }

    /// The steps selected to consume offers right now.
    ///
    /// Candidate phases are chosen by the plan strategy, then each phase's
    /// strategy picks its candidate steps; `dirty_assets` filters out
    /// steps whose pod instance is already being worked on.
    #[must_use]
    pub fn candidate_steps(&self, dirty_assets: &[PodInstanceRequirement]) -> Vec<Arc<Step>> {
        if self.is_interrupted() {
            return Vec::new();
        }
        self.strategy
            .candidates(&self.phases, dirty_assets)
            .iter()
            .flat_map(|phase| phase.candidates(dirty_assets))
            .collect()
    }
}

impl Element for Plan {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        let children: Vec<Status> = self.phases.iter().map(|p| p.status()).collect();
        let candidates: Vec<Status> = self
            .strategy
            .candidates(&self.phases, &[])
            .iter()
            .map(|p| p.status())
            .collect();
        aggregate_status(
            &self.name,
            &children,
            &candidates,
            &self.errors(),
            self.is_interrupted(),
        )
    }

    fn errors(&self) -> Vec<String> {
        self.errors.read().unwrap().clone()
    }

    fn is_eligible(&self, dirty_assets: &[PodInstanceRequirement]) -> bool {
        let _ = dirty_assets;
        !self.is_complete() && !self.has_errors() && !self.is_interrupted()
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("name", &self.name)
            .field("phases", &self.phases.len())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Requirements of every step currently holding a pod instance.
///
/// A step holds its pod instance from the moment it is prepared until the
/// cluster manager acknowledges the launch.
#[must_use]
pub fn dirty_assets(plan: &Plan) -> HashSet<PodInstanceRequirement> {
    plan.phases()
        .iter()
        .flat_map(|phase| phase.steps().iter())
        .filter(|step| step.is_prepared() || step.is_starting())
        .filter_map(|step| step.requirement().cloned())
        .collect()
}

/// Full task names across all steps' requirements in the given plans.
#[must_use]
pub fn launchable_tasks<'a, I>(plans: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a Plan>,
{
    plans
        .into_iter()
        .flat_map(|plan| plan.phases().iter())
        .flat_map(|phase| phase.steps().iter())
        .filter_map(|step| step.requirement())
        .flat_map(|requirement| requirement.task_names())
        .collect()
}
