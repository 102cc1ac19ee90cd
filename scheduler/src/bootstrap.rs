//! Subsystem wiring from configuration.
//!
//! Embedding binaries hand over their transport driver, plans, and
//! placement evaluator; this module builds the rest of the graph. A state
//! store that cannot be opened aborts the build: running without durable
//! task state would leave reconciliation blind after a restart.

use std::sync::Arc;
use std::time::Duration;

use ballast_plan::Plan;
use tokio::sync::watch;
use tracing::info;

use crate::client::{OfferEvaluator, PlanEventClient};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::driver::SchedulerDriver;
use crate::error::SchedulerError;
use crate::processor::{OfferProcessor, OfferProcessorConfig};
use crate::reconciler::Reconciler;
use crate::runner::FrameworkRunner;
use crate::state::SqliteStateStore;

/// The wired scheduler subsystems.
pub struct SchedulerRuntime {
    pub processor: Arc<OfferProcessor>,
    pub reconciler: Arc<Reconciler>,
    pub client: Arc<PlanEventClient>,
    pub runner: FrameworkRunner,
}

/// Builds the scheduler runtime from configuration.
///
/// Fails (fatally, for callers at boot) when the state database cannot be
/// opened.
pub fn build_runtime(
    config: &Config,
    driver: Arc<dyn SchedulerDriver>,
    plans: Vec<Arc<Plan>>,
    evaluator: Arc<dyn OfferEvaluator>,
    shutdown: watch::Receiver<bool>,
) -> Result<SchedulerRuntime, SchedulerError> {
    let state_store = Arc::new(SqliteStateStore::open(&config.state_db_path)?);
    info!(path = %config.state_db_path, "State store opened");

    let reconciler = Arc::new(Reconciler::new(
        state_store.clone(),
        driver.clone(),
        Arc::new(SystemClock),
    ));

    let client = Arc::new(PlanEventClient::new(
        plans,
        evaluator,
        reconciler.clone(),
        state_store,
    ));

    let processor = Arc::new(OfferProcessor::new(
        client.clone(),
        driver.clone(),
        OfferProcessorConfig {
            queue_capacity: config.offer_queue_capacity,
            synchronous: config.synchronous_offer_processing,
        },
        shutdown,
    ));

    let runner = FrameworkRunner::new(
        processor.clone(),
        reconciler.clone(),
        client.clone(),
        Duration::from_secs(config.reconcile_interval_secs),
    );

    Ok(SchedulerRuntime {
        processor,
        reconciler,
        client,
        runner,
    })
}
