//! Strategies for selecting which children may make progress.

use std::sync::Arc;

use crate::{Element, PodInstanceRequirement};

/// Selects the candidate children eligible to make progress right now.
pub trait Strategy<E: Element>: Send + Sync {
    /// Returns the children selected to proceed, given the assets
    /// currently being worked on elsewhere.
    fn candidates(&self, children: &[Arc<E>], dirty_assets: &[PodInstanceRequirement])
        -> Vec<Arc<E>>;

    /// Strategy name, for display.
    fn name(&self) -> &'static str;
}

/// Children proceed one at a time, in declared order.
///
/// The first non-complete child is the only candidate; if it is not
/// eligible nothing proceeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialStrategy;

impl<E: Element> Strategy<E> for SerialStrategy {
    fn candidates(
        &self,
        children: &[Arc<E>],
        dirty_assets: &[PodInstanceRequirement],
    ) -> Vec<Arc<E>> {
        for child in children {
            if child.is_complete() {
                continue;
            }
            if child.is_eligible(dirty_assets) {
                return vec![Arc::clone(child)];
            }
            return Vec::new();
        }
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

/// All eligible children proceed at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelStrategy;

impl<E: Element> Strategy<E> for ParallelStrategy {
    fn candidates(
        &self,
        children: &[Arc<E>],
        dirty_assets: &[PodInstanceRequirement],
    ) -> Vec<Arc<E>> {
        children
            .iter()
            .filter(|child| !child.is_complete() && child.is_eligible(dirty_assets))
            .map(Arc::clone)
            .collect()
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Status, Step};

    fn steps(statuses: &[Status]) -> Vec<Arc<Step>> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                Arc::new(Step::with_status(
                    &format!("node-{i}"),
                    Some(PodInstanceRequirement::new("node", i as u32, ["server"])),
                    *status,
                ))
            })
            .collect()
    }

    #[test]
    fn test_serial_selects_first_incomplete() {
        let children = steps(&[Status::Complete, Status::Pending, Status::Pending]);
        let strategy = SerialStrategy;
        let candidates = strategy.candidates(&children, &[]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name(), "node-1");
    }

    #[test]
    fn test_serial_blocks_on_conflicted_head() {
        let children = steps(&[Status::Complete, Status::Pending, Status::Pending]);
        let dirty = vec![PodInstanceRequirement::new("node", 1, ["server"])];
        let strategy = SerialStrategy;
        // node-1 conflicts; serial does not skip ahead to node-2.
        assert!(strategy.candidates(&children, &dirty).is_empty());
    }

    #[test]
    fn test_serial_all_complete() {
        let children = steps(&[Status::Complete, Status::Complete]);
        let strategy = SerialStrategy;
        assert!(strategy.candidates(&children, &[]).is_empty());
    }

    #[test]
    fn test_parallel_selects_all_eligible() {
        let children = steps(&[Status::Pending, Status::Complete, Status::Starting]);
        let strategy = ParallelStrategy;
        let candidates = strategy.candidates(&children, &[]);
        let names: Vec<_> = candidates.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["node-0", "node-2"]);
    }

    #[test]
    fn test_parallel_skips_conflicts() {
        let children = steps(&[Status::Pending, Status::Pending]);
        let dirty = vec![PodInstanceRequirement::new("node", 0, ["server"])];
        let strategy = ParallelStrategy;
        let candidates = strategy.candidates(&children, &dirty);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name(), "node-1");
    }
}
