//! Ballast scheduler core.
//!
//! Brokers between a resource-offering cluster manager and workload
//! clients that reserve resources, launch tasks, and release them. Three
//! subsystems cooperate:
//!
//! - The **offer pipeline** ([`queue`], [`processor`], [`cleanup`])
//!   ingests bursts of offers, hands them to the event client for
//!   evaluation, returns unused offers, and applies the client's
//!   recommendations plus any destroy/unreserve cleanup.
//! - The **reconciler** ([`reconciler`]) converges our view of task state
//!   with the cluster manager's, explicit-then-implicit with exponential
//!   backoff.
//! - The **plan tree** (`ballast-plan`) models long-running workflows and
//!   exposes which work may consume offers; [`client`] composes over it.
//!
//! The cluster-manager transport is injected behind the
//! [`driver::SchedulerDriver`] trait; this crate never speaks the wire
//! protocol itself.

pub mod artifact;
pub mod bootstrap;
pub mod cleanup;
pub mod client;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod processor;
pub mod queue;
pub mod reconciler;
pub mod runner;
pub mod state;
pub mod telemetry;

pub use bootstrap::{build_runtime, SchedulerRuntime};
pub use client::{
    ClientResult, MesosEventClient, OfferEvaluator, OfferResponse, PlanEventClient,
    UnexpectedResourcesResponse,
};
pub use config::Config;
pub use driver::{MockDriver, SchedulerDriver};
pub use error::SchedulerError;
pub use processor::{OfferProcessor, OfferProcessorConfig};
pub use reconciler::Reconciler;
pub use runner::{FrameworkRunner, SchedulerEvent};
