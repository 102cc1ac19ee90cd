//! Event client interface and the plan-driven implementation.
//!
//! The offer processor treats the client as an opaque evaluator: it hands
//! over each offer batch, gets back unused offers plus recommendations,
//! and separately asks which reserved resources are unexpected. The
//! production client composes over the plan tree to decide which work may
//! consume offers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use ballast_id::ResourceId;
use ballast_plan::{dirty_assets, Plan, PodInstanceRequirement};
use ballast_protocol::{Offer, OfferRecommendation, OfferResources, TaskStatus};
use tracing::{debug, info, warn};

use crate::reconciler::Reconciler;
use crate::state::StateStore;

/// Outcome of one client call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientResult {
    /// The client looked at the input and handled it.
    Processed,
    /// The client could not look at the input (not initialized yet, or
    /// mid-reconciliation). The processor declines short and retries soon.
    NotReady,
    /// The client's service has been torn down; nothing left to process.
    Uninstalled,
}

/// Response to an offer batch.
#[derive(Debug, Clone)]
pub struct OfferResponse {
    pub result: ClientResult,
    /// Offers the client did not consume.
    pub unused_offers: Vec<Offer>,
    /// Operations to apply against consumed offers.
    pub recommendations: Vec<OfferRecommendation>,
}

impl OfferResponse {
    /// A not-ready response returning every offer unused.
    #[must_use]
    pub fn not_ready(unused_offers: Vec<Offer>) -> Self {
        Self {
            result: ClientResult::NotReady,
            unused_offers,
            recommendations: Vec::new(),
        }
    }
}

/// Response to an unexpected-resources query.
#[derive(Debug, Clone)]
pub struct UnexpectedResourcesResponse {
    pub result: ClientResult,
    /// Unused offers grouped with their unexpected reserved resources.
    pub offer_resources: Vec<OfferResources>,
}

impl UnexpectedResourcesResponse {
    /// A processed response with no unexpected resources.
    #[must_use]
    pub fn none() -> Self {
        Self {
            result: ClientResult::Processed,
            offer_resources: Vec::new(),
        }
    }
}

/// The scheduler-facing side of a workload client.
///
/// `offers` is only ever called from the single consumer task, so
/// implementations may assume that callback is serialized. Errors out of
/// `offers` or `get_unexpected_resources` are structural and terminate
/// the process.
#[async_trait]
pub trait MesosEventClient: Send + Sync {
    /// Called once registration with the cluster manager completes.
    async fn registered(&self) -> Result<()>;

    /// Evaluates an offer batch.
    async fn offers(&self, offers: &[Offer]) -> Result<OfferResponse>;

    /// Flags reserved resources in unused offers that nothing expects.
    async fn get_unexpected_resources(
        &self,
        unused_offers: &[Offer],
    ) -> Result<UnexpectedResourcesResponse>;

    /// Routes one task status report.
    async fn task_status(&self, status: &TaskStatus) -> Result<()>;
}

/// Turns eligible work into recommendations against concrete offers.
///
/// The placement algorithm lives behind this seam; the scheduler core
/// only routes its output.
pub trait OfferEvaluator: Send + Sync {
    /// Matches the given requirements against the offer batch.
    ///
    /// Returns the offers left unused and the recommendations to apply.
    fn evaluate(
        &self,
        requirements: &[PodInstanceRequirement],
        offers: &[Offer],
    ) -> (Vec<Offer>, Vec<OfferRecommendation>);
}

/// Event client composed over the plan tree.
///
/// On each offer cycle it collects the steps every active plan selects as
/// candidates (excluding pod instances already being worked on), marks
/// them prepared, and hands their requirements to the evaluator. Status
/// reports are routed to the reconciler, the plan steps, and the state
/// store.
pub struct PlanEventClient {
    plans: Vec<Arc<Plan>>,
    evaluator: Arc<dyn OfferEvaluator>,
    reconciler: Arc<Reconciler>,
    state_store: Arc<dyn StateStore>,
    /// Resource ids the service still expects to hold. Reserved resources
    /// outside this set are offered back for cleanup.
    expected_resources: RwLock<HashSet<ResourceId>>,
    initialized: AtomicBool,
}

impl PlanEventClient {
    /// Creates a client over the given plans.
    pub fn new(
        plans: Vec<Arc<Plan>>,
        evaluator: Arc<dyn OfferEvaluator>,
        reconciler: Arc<Reconciler>,
        state_store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            plans,
            evaluator,
            reconciler,
            state_store,
            expected_resources: RwLock::new(HashSet::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Replaces the set of resource ids the service expects to hold.
    pub fn set_expected_resources<I: IntoIterator<Item = ResourceId>>(&self, resource_ids: I) {
        *self.expected_resources.write().unwrap() = resource_ids.into_iter().collect();
    }

    /// The plans this client drives.
    #[must_use]
    pub fn plans(&self) -> &[Arc<Plan>] {
        &self.plans
    }

    fn select_requirements(&self) -> Vec<PodInstanceRequirement> {
        // A plan's own prepared steps are its candidates, so only work
        // held by *other* plans fences a plan's selection.
        let per_plan_dirty: Vec<Vec<PodInstanceRequirement>> = self
            .plans
            .iter()
            .map(|plan| dirty_assets(plan).into_iter().collect())
            .collect();

        let mut requirements: Vec<PodInstanceRequirement> = Vec::new();
        for (index, plan) in self.plans.iter().enumerate() {
            if !plan.has_operations() {
                continue;
            }
            let dirty: Vec<PodInstanceRequirement> = per_plan_dirty
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .flat_map(|(_, assets)| assets.iter().cloned())
                .chain(requirements.iter().cloned())
                .collect();
            for step in plan.candidate_steps(&dirty) {
                if let Some(requirement) = step.start() {
                    // Instances claimed earlier in this cycle stay claimed.
                    if requirement.conflicts_with_any(&requirements) {
                        continue;
                    }
                    requirements.push(requirement);
                }
            }
        }
        requirements
    }
}

#[async_trait]
impl MesosEventClient for PlanEventClient {
    async fn registered(&self) -> Result<()> {
        info!("Client registered; offer evaluation enabled");
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn offers(&self, offers: &[Offer]) -> Result<OfferResponse> {
        if !self.initialized.load(Ordering::SeqCst) {
            debug!("Not registered yet; returning offers unused");
            return Ok(OfferResponse::not_ready(offers.to_vec()));
        }
        if !self.reconciler.is_reconciled() {
            debug!("Reconciliation in progress; returning offers unused");
            return Ok(OfferResponse::not_ready(offers.to_vec()));
        }

        let requirements = self.select_requirements();
        debug!(
            offer_count = offers.len(),
            requirement_count = requirements.len(),
            "Evaluating offers against eligible work"
        );

        let (unused_offers, recommendations) = self.evaluator.evaluate(&requirements, offers);
        Ok(OfferResponse {
            result: ClientResult::Processed,
            unused_offers,
            recommendations,
        })
    }

    async fn get_unexpected_resources(
        &self,
        unused_offers: &[Offer],
    ) -> Result<UnexpectedResourcesResponse> {
        if !self.initialized.load(Ordering::SeqCst) || !self.reconciler.is_reconciled() {
            // Flagging reservations before task state has converged could
            // destroy volumes that are still in use.
            return Ok(UnexpectedResourcesResponse {
                result: ClientResult::NotReady,
                offer_resources: Vec::new(),
            });
        }

        let expected = self.expected_resources.read().unwrap();
        let mut offer_resources = Vec::new();
        for offer in unused_offers {
            let unexpected: Vec<_> = offer
                .resources
                .iter()
                .filter(|resource| {
                    resource
                        .resource_id()
                        .is_some_and(|id| !expected.contains(id))
                })
                .cloned()
                .collect();
            if !unexpected.is_empty() {
                info!(
                    offer_id = %offer.id,
                    count = unexpected.len(),
                    "Found unexpected reserved resources"
                );
                offer_resources.push(OfferResources::new(offer.clone(), unexpected));
            }
        }

        Ok(UnexpectedResourcesResponse {
            result: ClientResult::Processed,
            offer_resources,
        })
    }

    async fn task_status(&self, status: &TaskStatus) -> Result<()> {
        self.reconciler.update(status);

        if let Err(e) = self.state_store.store_status(status) {
            warn!(task_id = %status.task_id, error = %e, "Failed to persist task status");
        }

        let task_name = status.task_id.task_name();
        for plan in &self.plans {
            for phase in plan.phases() {
                for step in phase.steps() {
                    step.handle_task_status(task_name, status.state);
                }
            }
        }
        Ok(())
    }
}

/// Scripted client for tests.
///
/// Responses are served in FIFO order; when the script runs dry the
/// client reports every offer unused with a processed result.
#[derive(Default)]
pub struct MockEventClient {
    offer_responses: Mutex<std::collections::VecDeque<OfferResponse>>,
    unexpected_responses: Mutex<std::collections::VecDeque<UnexpectedResourcesResponse>>,
    offer_batches: Mutex<Vec<Vec<Offer>>>,
    statuses: Mutex<Vec<TaskStatus>>,
}

impl MockEventClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next `offers` call.
    pub fn push_offer_response(&self, response: OfferResponse) {
        self.offer_responses.lock().unwrap().push_back(response);
    }

    /// Queues a response for the next `get_unexpected_resources` call.
    pub fn push_unexpected_response(&self, response: UnexpectedResourcesResponse) {
        self.unexpected_responses.lock().unwrap().push_back(response);
    }

    /// Offer batches received so far.
    #[must_use]
    pub fn offer_batches(&self) -> Vec<Vec<Offer>> {
        self.offer_batches.lock().unwrap().clone()
    }

    /// Status reports received so far.
    #[must_use]
    pub fn statuses(&self) -> Vec<TaskStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl MesosEventClient for MockEventClient {
    async fn registered(&self) -> Result<()> {
        Ok(())
    }

    async fn offers(&self, offers: &[Offer]) -> Result<OfferResponse> {
        self.offer_batches.lock().unwrap().push(offers.to_vec());
        let scripted = self.offer_responses.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| OfferResponse {
            result: ClientResult::Processed,
            unused_offers: offers.to_vec(),
            recommendations: Vec::new(),
        }))
    }

    async fn get_unexpected_resources(
        &self,
        _unused_offers: &[Offer],
    ) -> Result<UnexpectedResourcesResponse> {
        let scripted = self.unexpected_responses.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(UnexpectedResourcesResponse::none))
    }

    async fn task_status(&self, status: &TaskStatus) -> Result<()> {
        self.statuses.lock().unwrap().push(status.clone());
        Ok(())
    }
}
