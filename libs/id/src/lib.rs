//! # ballast-id
//!
//! Typed identifier newtypes for the ballast scheduler.
//!
//! ## Design Principles
//!
//! - Identifiers are issued by the cluster manager and are opaque to us;
//!   the only structure we rely on is the task-name convention (see
//!   [`TaskId::task_name`])
//! - Identifiers are typed to prevent mixing different resource kinds
//! - Identifiers support roundtrip serialization (parse → format → parse)
//!
//! Unlike locally-generated IDs, these carry no prefix or timestamp: the
//! cluster manager is free to hand us any non-empty string.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;
