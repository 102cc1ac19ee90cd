//! End-to-end test of the framework runner driving a plan to completion.
//!
//! Wires the real subsystems together (plan-driven client, processor with
//! its consumer task, reconciler, runner) over a recording driver, then
//! feeds transport events: registration, offer bursts, status updates.

use std::sync::Arc;
use std::time::Duration;

use ballast_plan::{
    Element, ParallelStrategy, Phase, Plan, PodInstanceRequirement, SerialStrategy, Status, Step,
};
use ballast_protocol::{Offer, OfferRecommendation, Resource, TaskSpec, TaskState, TaskStatus};
use ballast_scheduler::client::{OfferEvaluator, PlanEventClient};
use ballast_scheduler::clock::SystemClock;
use ballast_scheduler::driver::MockDriver;
use ballast_scheduler::processor::{OfferProcessor, OfferProcessorConfig};
use ballast_scheduler::reconciler::Reconciler;
use ballast_scheduler::runner::{FrameworkRunner, SchedulerEvent};
use ballast_scheduler::state::{InMemoryStateStore, StateStore};
use tokio::sync::{mpsc, watch};

/// Launches each requirement's tasks against the next available offer.
struct FirstFitEvaluator;

impl OfferEvaluator for FirstFitEvaluator {
    fn evaluate(
        &self,
        requirements: &[PodInstanceRequirement],
        offers: &[Offer],
    ) -> (Vec<Offer>, Vec<OfferRecommendation>) {
        let mut unused: Vec<Offer> = offers.to_vec();
        let mut recommendations = Vec::new();
        for requirement in requirements {
            if unused.is_empty() {
                break;
            }
            let offer = unused.remove(0);
            for task_name in requirement.task_names() {
                recommendations.push(OfferRecommendation::Launch {
                    offer_id: offer.id.clone(),
                    task: TaskSpec::new(&task_name, vec![Resource::scalar("cpus", 1.0)]),
                });
            }
        }
        (unused, recommendations)
    }
}

fn offer(id: &str) -> Offer {
    Offer::new(
        id.parse().unwrap(),
        "agent-1".parse().unwrap(),
        "host-1",
        vec![Resource::scalar("cpus", 4.0)],
    )
}

fn running(task: &str) -> TaskStatus {
    TaskStatus::new(
        task.parse().unwrap(),
        TaskState::Running,
        "agent-1".parse().unwrap(),
        1000,
    )
}

async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deploy_plan_runs_to_completion() {
    let driver = Arc::new(MockDriver::new());
    let store = Arc::new(InMemoryStateStore::new());
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        driver.clone(),
        Arc::new(SystemClock),
    ));

    let plan = Arc::new(Plan::new(
        "deploy",
        vec![Phase::new(
            "nodes",
            vec![
                Step::new("node-0", Some(PodInstanceRequirement::new("node", 0, ["server"]))),
                Step::new("node-1", Some(PodInstanceRequirement::new("node", 1, ["server"]))),
            ],
            Arc::new(SerialStrategy),
        )],
        Arc::new(ParallelStrategy),
    ));

    let client = Arc::new(PlanEventClient::new(
        vec![plan.clone()],
        Arc::new(FirstFitEvaluator),
        reconciler.clone(),
        store.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor = Arc::new(OfferProcessor::new(
        client.clone(),
        driver.clone(),
        OfferProcessorConfig::default(),
        shutdown_rx.clone(),
    ));

    let runner = FrameworkRunner::new(
        processor.clone(),
        reconciler.clone(),
        client.clone(),
        Duration::from_secs(3600),
    );

    let (events_tx, events_rx) = mpsc::channel(16);
    let runner_task = tokio::spawn(async move { runner.run(events_rx, shutdown_rx).await });

    // Registration starts the subsystems and fires the implicit
    // reconciliation (nothing was persisted).
    events_tx
        .send(SchedulerEvent::Registered {
            framework_id: "fw-1".parse().unwrap(),
        })
        .await
        .unwrap();
    {
        let driver = driver.clone();
        wait_until("implicit reconciliation", move || {
            driver.reconciles().iter().any(|r| r.is_empty())
        })
        .await;
    }

    // First offer: the serial phase only exposes node-0.
    events_tx
        .send(SchedulerEvent::Offers(vec![offer("offer-1")]))
        .await
        .unwrap();
    {
        let driver = driver.clone();
        wait_until("node-0 launch", move || !driver.accepts().is_empty()).await;
    }
    assert_eq!(plan.status(), Status::InProgress);

    // The launched task comes up; node-0 completes.
    events_tx
        .send(SchedulerEvent::StatusUpdate(running("node-0-server__1")))
        .await
        .unwrap();
    {
        let plan = plan.clone();
        wait_until("node-0 completion", move || {
            plan.phases()[0].steps()[0].status() == Status::Complete
        })
        .await;
    }

    // Second offer reaches node-1.
    events_tx
        .send(SchedulerEvent::Offers(vec![offer("offer-2")]))
        .await
        .unwrap();
    {
        let driver = driver.clone();
        wait_until("node-1 launch", move || driver.accepts().len() >= 2).await;
    }

    events_tx
        .send(SchedulerEvent::StatusUpdate(running("node-1-server__1")))
        .await
        .unwrap();
    {
        let plan = plan.clone();
        wait_until("plan completion", move || plan.status() == Status::Complete).await;
    }
    assert!(!plan.has_operations());

    // The statuses were persisted along the way.
    let persisted = store.fetch_statuses().unwrap();
    assert_eq!(persisted.len(), 2);

    shutdown_tx.send(true).unwrap();
    runner_task.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_offers_before_registration_are_declined_short() {
    let driver = Arc::new(MockDriver::new());
    let store = Arc::new(InMemoryStateStore::new());
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        driver.clone(),
        Arc::new(SystemClock),
    ));

    let client = Arc::new(PlanEventClient::new(
        vec![],
        Arc::new(FirstFitEvaluator),
        reconciler.clone(),
        store.clone(),
    ));

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor = OfferProcessor::new(
        client.clone(),
        driver.clone(),
        OfferProcessorConfig {
            queue_capacity: 10,
            synchronous: true,
        },
        shutdown_rx,
    );

    // The processor is running but the client never saw registered():
    // it reports not-ready and the offers are declined short.
    processor.start();
    processor.enqueue(vec![offer("offer-1")]).await;

    let declines = driver.declines();
    assert_eq!(declines.len(), 1);
    assert_eq!(declines[0].refuse_seconds, ballast_protocol::SHORT_DECLINE_SECONDS);
    assert!(driver.accepts().is_empty());
}
