//! Common behavior shared by plans, phases, and steps.

use crate::{PodInstanceRequirement, Status};

/// A node in the plan tree.
pub trait Element: Send + Sync {
    /// Name of the element, unique within its parent.
    fn name(&self) -> &str;

    /// Current status. For parents this is derived from children on every
    /// call; it is never cached.
    fn status(&self) -> Status;

    /// Errors attached to this element.
    fn errors(&self) -> Vec<String>;

    /// Returns true once the element has finished successfully.
    fn is_complete(&self) -> bool {
        self.status() == Status::Complete
    }

    /// Returns true if the element carries errors.
    fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    /// Whether this element may proceed with work.
    ///
    /// Complete elements and elements with errors are never eligible.
    /// Steps additionally refuse to run while their pod instance is
    /// claimed by an entry in `dirty_assets`; plans refuse while
    /// interrupted.
    fn is_eligible(&self, dirty_assets: &[PodInstanceRequirement]) -> bool {
        let _ = dirty_assets;
        !self.is_complete() && !self.has_errors()
    }
}
