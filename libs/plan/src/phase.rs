//! Phases: ordered collections of steps.

use std::sync::Arc;

use crate::{aggregate_status, Element, PodInstanceRequirement, Status, Step, Strategy};

/// An ordered collection of steps advancing under one strategy.
pub struct Phase {
    name: String,
    steps: Vec<Arc<Step>>,
    strategy: Arc<dyn Strategy<Step>>,
    errors: Vec<String>,
}

impl Phase {
    /// Creates a phase over the provided steps.
    #[must_use]
    pub fn new(name: &str, steps: Vec<Step>, strategy: Arc<dyn Strategy<Step>>) -> Self {
        Self {
            name: name.to_string(),
            steps: steps.into_iter().map(Arc::new).collect(),
            strategy,
            errors: Vec::new(),
        }
    }

    /// Creates a phase with construction-time errors attached.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    /// The phase's steps, in declared order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<Step>] {
        &self.steps
    }

    /// The steps the strategy selects to proceed next.
    #[must_use]
    pub fn candidates(&self, dirty_assets: &[PodInstanceRequirement]) -> Vec<Arc<Step>> {
        self.strategy.candidates(&self.steps, dirty_assets)
    }

    /// The strategy driving this phase.
    #[must_use]
    pub fn strategy(&self) -> &dyn Strategy<Step> {
        self.strategy.as_ref()
    }
}

impl Element for Phase {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        let children: Vec<Status> = self.steps.iter().map(|s| s.status()).collect();
        let candidates: Vec<Status> = self
            .strategy
            .candidates(&self.steps, &[])
            .iter()
            .map(|s| s.status())
            .collect();
        aggregate_status(&self.name, &children, &candidates, &self.errors, false)
    }

    fn errors(&self) -> Vec<String> {
        self.errors.clone()
    }
}

impl std::fmt::Debug for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SerialStrategy;

    fn phase(statuses: &[Status]) -> Phase {
        let steps = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                Step::with_status(
                    &format!("node-{i}"),
                    Some(PodInstanceRequirement::new("node", i as u32, ["server"])),
                    *status,
                )
            })
            .collect();
        Phase::new("deploy", steps, Arc::new(SerialStrategy))
    }

    #[test]
    fn test_phase_pending_when_nothing_started() {
        assert_eq!(phase(&[Status::Pending, Status::Pending]).status(), Status::Pending);
    }

    #[test]
    fn test_phase_complete_when_all_steps_complete() {
        assert_eq!(phase(&[Status::Complete, Status::Complete]).status(), Status::Complete);
    }

    #[test]
    fn test_phase_in_progress_with_prepared_step() {
        assert_eq!(
            phase(&[Status::Prepared, Status::Pending]).status(),
            Status::InProgress
        );
    }

    #[test]
    fn test_phase_in_progress_with_partial_completion() {
        assert_eq!(
            phase(&[Status::Complete, Status::Pending]).status(),
            Status::InProgress
        );
    }

    #[test]
    fn test_phase_error_when_step_errored() {
        assert_eq!(phase(&[Status::Error, Status::Pending]).status(), Status::Error);
    }
}
