//! Plan/phase/step work tree.
//!
//! Long-running workflows (install, update, uninstall) are modeled as a
//! hierarchy of [`Plan`] → [`Phase`] → [`Step`]. Steps are the smallest
//! unit of work and the only elements that consume offers; phases and
//! plans order steps and derive their own status from their children.
//!
//! # Invariants
//!
//! - A parent's status is a pure function of its children's statuses, its
//!   candidates' statuses, its errors, and its interruption flag
//! - A step that is complete or carries errors is never eligible for work
//! - Two steps working the same pod instance never run concurrently; the
//!   dirty-asset set enforces this

mod element;
mod phase;
mod plan;
mod requirement;
mod status;
mod step;
mod strategy;

pub use element::Element;
pub use phase::Phase;
pub use plan::{dirty_assets, launchable_tasks, Plan};
pub use requirement::PodInstanceRequirement;
pub use status::{aggregate_status, Status};
pub use step::{GoalState, Step};
pub use strategy::{ParallelStrategy, SerialStrategy, Strategy};
