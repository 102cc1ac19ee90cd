//! Offer processing pipeline.
//!
//! Driver callbacks enqueue offer bursts; a single consumer drains the
//! queue and runs each batch through evaluation:
//!
//! 1. The event client looks at the batch and returns unused offers plus
//!    recommendations.
//! 2. Unexpected reserved resources in the unused offers are converted to
//!    destroy/unreserve cleanup recommendations.
//! 3. Offers that remain unused are declined (long interval when both
//!    client calls were processed, short otherwise).
//! 4. Client recommendations and then cleanup recommendations are applied.
//!
//! Every enqueued offer id stays in the in-progress set until its batch
//! has been fully evaluated, or until it has been declined due to queue
//! overflow; removal strictly follows the decline.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ballast_id::OfferId;
use ballast_protocol::{Filters, Offer, OfferRecommendation, Operation};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cleanup::cleanup_recommendations;
use crate::client::{ClientResult, MesosEventClient};
use crate::driver::SchedulerDriver;
use crate::error::SchedulerError;
use crate::metrics;
use crate::queue::OfferQueue;

/// Offer processor tuning.
#[derive(Debug, Clone)]
pub struct OfferProcessorConfig {
    /// Offer queue capacity; zero for unbounded.
    pub queue_capacity: usize,

    /// Process batches inline on the enqueueing task instead of spawning
    /// the dedicated consumer. Test-only behavior.
    pub synchronous: bool,
}

impl Default for OfferProcessorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: OfferQueue::DEFAULT_CAPACITY,
            synchronous: false,
        }
    }
}

/// Owns the offer queue and the consumer loop.
pub struct OfferProcessor {
    inner: Arc<Inner>,
    synchronous: bool,
    started: AtomicBool,
    shutdown: watch::Receiver<bool>,
}

struct Inner {
    client: Arc<dyn MesosEventClient>,
    driver: Arc<dyn SchedulerDriver>,
    queue: OfferQueue,
    in_progress: Mutex<HashSet<OfferId>>,
    /// Offers drained before registration completes are left untouched;
    /// downstream state is not ready for them.
    initialized: AtomicBool,
}

impl OfferProcessor {
    /// Creates a processor over the given client and driver.
    pub fn new(
        client: Arc<dyn MesosEventClient>,
        driver: Arc<dyn SchedulerDriver>,
        config: OfferProcessorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                driver,
                queue: OfferQueue::new(config.queue_capacity),
                in_progress: Mutex::new(HashSet::new()),
                initialized: AtomicBool::new(false),
            }),
            synchronous: config.synchronous,
            started: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Starts the consumer and opens the initialization gate. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        if !self.synchronous {
            let inner = Arc::clone(&self.inner);
            let mut shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                info!("Offer consumer started");
                loop {
                    if *shutdown.borrow() {
                        info!("Offer consumer shutting down");
                        break;
                    }
                    inner.process_queued_offers(&mut shutdown).await;
                }
            });
        }

        self.inner.initialized.store(true, Ordering::SeqCst);
    }

    /// Buffers a burst of offers for evaluation.
    ///
    /// Each offer id enters the in-progress set before the offer is
    /// queued. An offer rejected by a full queue is declined for the
    /// short interval first, and only then removed from in-progress, so
    /// the batch never looks finished before the decline has landed.
    pub async fn enqueue(&self, offers: Vec<Offer>) {
        {
            let mut in_progress = self.inner.in_progress.lock().unwrap();
            in_progress.extend(offers.iter().map(|offer| offer.id.clone()));
            info!(
                count = offers.len(),
                in_progress = in_progress.len(),
                "Enqueued offers"
            );
        }
        metrics::inc_offers_enqueued(offers.len());

        for offer in offers {
            let offer_id = offer.id.clone();
            if !self.inner.queue.offer(offer) {
                warn!(
                    offer_id = %offer_id,
                    "Offer queue is full: declining offer and removing from in-progress"
                );
                self.inner
                    .decline_offers(std::slice::from_ref(&offer_id), Filters::refuse_short())
                    .await;
                metrics::inc_declines_short(1);
                // Remove after the decline returns: removing first would
                // let await_offers_processed observe completion before
                // the offer was actually handed back.
                self.inner.in_progress.lock().unwrap().remove(&offer_id);
            }
        }

        if self.synchronous {
            let mut shutdown = self.shutdown.clone();
            self.inner.process_queued_offers(&mut shutdown).await;
        }
    }

    /// Drops a buffered offer that the cluster manager rescinded.
    pub fn dequeue(&self, offer_id: &OfferId) -> bool {
        self.inner.queue.remove(offer_id)
    }

    /// Offer ids currently in progress.
    #[must_use]
    pub fn offers_in_progress(&self) -> HashSet<OfferId> {
        self.inner.in_progress.lock().unwrap().clone()
    }

    /// Waits until every enqueued offer has been processed.
    ///
    /// Polls on a 100ms cadence for up to 5s, then reports a fatal
    /// timeout. Testing aid: every offer must already have been handed to
    /// `enqueue` before calling this.
    pub async fn await_offers_processed(&self) -> Result<(), SchedulerError> {
        const TOTAL_MS: u64 = 5000;
        const SLEEP_MS: u64 = 100;

        for _ in 0..(TOTAL_MS / SLEEP_MS) {
            {
                let in_progress = self.inner.in_progress.lock().unwrap();
                if in_progress.is_empty() {
                    info!("All offers processed");
                    return Ok(());
                }
                debug!(remaining = in_progress.len(), "Offers still in progress");
            }
            tokio::time::sleep(Duration::from_millis(SLEEP_MS)).await;
        }

        Err(SchedulerError::AwaitOffersTimeout {
            waited_ms: TOTAL_MS,
        })
    }
}

impl Inner {
    /// Drains the queue, potentially blocking until offers appear, and
    /// evaluates the batch.
    async fn process_queued_offers(&self, shutdown: &mut watch::Receiver<bool>) {
        debug!("Waiting for queued offers");
        let offers = self.queue.take_all(shutdown).await;

        if offers.is_empty() && !self.initialized.load(Ordering::SeqCst) {
            info!("Retrying wait for offers: registration has not completed yet");
            return;
        }

        let started = Instant::now();
        let result = self.evaluate_offers(&offers).await;
        metrics::record_process_duration(started.elapsed());

        // The in-progress entries must be cleared even when evaluation
        // fails, or await_offers_processed would deadlock.
        metrics::inc_offers_processed(offers.len());
        {
            let mut in_progress = self.in_progress.lock().unwrap();
            for offer in &offers {
                in_progress.remove(&offer.id);
            }
            info!(
                processed = offers.len(),
                remaining = in_progress.len(),
                "Processed queued offers"
            );
        }

        if let Err(e) = result {
            error!(error = %e, "Error encountered when processing offers, exiting to avoid zombie state");
            std::process::exit(1);
        }
    }

    async fn evaluate_offers(&self, offers: &[Offer]) -> anyhow::Result<()> {
        // The client looks at the batch and tells us which offers it did
        // not use and which operations to perform.
        let offer_response = self.client.offers(offers).await?;

        // Unused offers can still carry reserved resources that nothing
        // expects (uninstalls, decommissioned tasks, agents coming back
        // from the dead). Those must be destroyed/unreserved. Unexpected
        // resources inside used offers are cleaned on a later cycle, when
        // they are offered again.
        let unexpected = self
            .client
            .get_unexpected_resources(&offer_response.unused_offers)
            .await?;
        let cleanup = cleanup_recommendations(&unexpected.offer_resources);

        // Decline whatever neither evaluation nor cleanup touched. An
        // offer referenced by any recommendation is about to be accepted
        // and must never also be declined.
        let accepted: HashSet<&OfferId> = offer_response
            .recommendations
            .iter()
            .chain(cleanup.iter())
            .map(|rec| rec.offer_id())
            .collect();
        let unused: Vec<&Offer> = offer_response
            .unused_offers
            .iter()
            .filter(|offer| !accepted.contains(&offer.id))
            .collect();
        if !unused.is_empty() {
            let unused_ids: Vec<OfferId> =
                unused.iter().map(|offer| offer.id.clone()).collect();
            if offer_response.result == ClientResult::Processed
                && unexpected.result == ClientResult::Processed
            {
                // Fully processed and not interested: suppress re-offers
                // for a while.
                self.decline_offers(&unused_ids, Filters::refuse_long()).await;
                metrics::inc_declines_long(unused_ids.len());
            } else {
                // The client could not look at the offers; ask for them
                // again soon.
                self.decline_offers(&unused_ids, Filters::refuse_short()).await;
                metrics::inc_declines_short(unused_ids.len());
            }
        }

        let mut recommendations = offer_response.recommendations;
        recommendations.extend(cleanup);
        metrics::inc_recommendations(&recommendations);
        self.accept(&recommendations).await;

        Ok(())
    }

    async fn decline_offers(&self, offer_ids: &[OfferId], filters: Filters) {
        if offer_ids.is_empty() {
            return;
        }
        info!(
            count = offer_ids.len(),
            refuse_seconds = filters.refuse_seconds,
            "Declining unused offers"
        );
        for offer_id in offer_ids {
            if let Err(e) = self.driver.decline_offer(offer_id, &filters).await {
                warn!(offer_id = %offer_id, error = %e, "Failed to decline offer");
            }
        }
    }

    /// Applies recommendations, grouped per offer in first-seen order.
    ///
    /// Store markers produce no cluster operation and are skipped here.
    async fn accept(&self, recommendations: &[OfferRecommendation]) {
        let mut offer_order: Vec<OfferId> = Vec::new();
        let mut by_offer: HashMap<OfferId, Vec<Operation>> = HashMap::new();

        for recommendation in recommendations {
            let Some(operation) = recommendation.operation() else {
                continue;
            };
            by_offer
                .entry(recommendation.offer_id().clone())
                .or_insert_with(|| {
                    offer_order.push(recommendation.offer_id().clone());
                    Vec::new()
                })
                .push(operation);
        }

        for offer_id in offer_order {
            let operations = &by_offer[&offer_id];
            info!(
                offer_id = %offer_id,
                operation_count = operations.len(),
                "Accepting offer"
            );
            if let Err(e) = self
                .driver
                .accept_offers(
                    std::slice::from_ref(&offer_id),
                    operations,
                    &Filters::default(),
                )
                .await
            {
                warn!(offer_id = %offer_id, error = %e, "Failed to accept offer");
            }
        }
    }
}
