//! Framework runner: event dispatch and the reconcile timer.
//!
//! The transport adapter registers with the cluster manager and feeds
//! [`SchedulerEvent`]s into the runner, which dispatches them to the
//! offer processor, the event client, and the reconciler. A periodic
//! timer keeps reconciliation moving between status callbacks.

use std::sync::Arc;
use std::time::Duration;

use ballast_id::{FrameworkId, OfferId};
use ballast_protocol::{Offer, TaskStatus};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::client::MesosEventClient;
use crate::error::SchedulerError;
use crate::processor::OfferProcessor;
use crate::reconciler::Reconciler;

/// Callbacks delivered by the cluster-manager transport.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// Registration completed; the scheduler may begin working.
    Registered { framework_id: FrameworkId },
    /// A burst of resource offers.
    Offers(Vec<Offer>),
    /// A previously sent offer is no longer valid.
    Rescind(OfferId),
    /// A task status report.
    StatusUpdate(TaskStatus),
}

/// Dispatches transport events into the scheduler subsystems.
pub struct FrameworkRunner {
    processor: Arc<OfferProcessor>,
    reconciler: Arc<Reconciler>,
    client: Arc<dyn MesosEventClient>,
    reconcile_interval: Duration,
}

impl FrameworkRunner {
    /// Creates a runner over the given subsystems.
    pub fn new(
        processor: Arc<OfferProcessor>,
        reconciler: Arc<Reconciler>,
        client: Arc<dyn MesosEventClient>,
        reconcile_interval: Duration,
    ) -> Self {
        Self {
            processor,
            reconciler,
            client,
            reconcile_interval,
        }
    }

    /// Runs the dispatch loop until shutdown is signaled or the event
    /// stream closes.
    ///
    /// A failure to initialize reconciliation at registration time is
    /// structural and aborts the run.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<SchedulerEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SchedulerError> {
        info!(
            reconcile_interval_secs = self.reconcile_interval.as_secs(),
            "Starting framework runner"
        );

        let mut reconcile_interval = tokio::time::interval(self.reconcile_interval);
        // The timer only matters once registration has happened.
        reconcile_interval.tick().await;
        let mut registered = false;

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.dispatch(event, &mut registered).await?,
                        None => {
                            info!("Event stream closed; framework runner exiting");
                            return Ok(());
                        }
                    }
                }
                _ = reconcile_interval.tick() => {
                    if registered {
                        self.reconciler.reconcile().await;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Framework runner shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        event: SchedulerEvent,
        registered: &mut bool,
    ) -> Result<(), SchedulerError> {
        match event {
            SchedulerEvent::Registered { framework_id } => {
                info!(framework_id = %framework_id, "Registered with cluster manager");
                if let Err(e) = self.client.registered().await {
                    warn!(error = %e, "Client registration callback failed");
                }
                // Boot-time persistence failures are structural.
                if let Err(e) = self.reconciler.start() {
                    error!(error = %e, "Failed to initialize reconciliation");
                    return Err(e);
                }
                self.processor.start();
                *registered = true;
                // Kick reconciliation immediately rather than waiting for
                // the first timer tick.
                self.reconciler.reconcile().await;
            }
            SchedulerEvent::Offers(offers) => {
                self.processor.enqueue(offers).await;
            }
            SchedulerEvent::Rescind(offer_id) => {
                info!(offer_id = %offer_id, "Offer rescinded");
                self.processor.dequeue(&offer_id);
            }
            SchedulerEvent::StatusUpdate(status) => {
                if let Err(e) = self.client.task_status(&status).await {
                    warn!(task_id = %status.task_id, error = %e, "Status update handling failed");
                }
            }
        }
        Ok(())
    }
}
