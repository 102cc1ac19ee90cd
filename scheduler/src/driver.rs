//! Cluster-manager driver interface.
//!
//! The driver is the scheduler's only outbound channel to the cluster
//! manager. It is injected down the constructor graph as an
//! `Arc<dyn SchedulerDriver>`; its lifecycle is set once at registration
//! and never reset.
//!
//! Driver calls may block on network I/O. Callers must never hold an
//! internal lock across a driver call.

use anyhow::Result;
use async_trait::async_trait;
use ballast_id::OfferId;
use ballast_protocol::{Filters, Operation, TaskStatus};

/// Outbound operations against the cluster manager.
#[async_trait]
pub trait SchedulerDriver: Send + Sync {
    /// Returns an offer unused, suppressing re-offers for
    /// `filters.refuse_seconds`.
    async fn decline_offer(&self, offer_id: &OfferId, filters: &Filters) -> Result<()>;

    /// Applies operations against offers atomically.
    async fn accept_offers(
        &self,
        offer_ids: &[OfferId],
        operations: &[Operation],
        filters: &Filters,
    ) -> Result<()>;

    /// Requests the latest status for the given tasks; an empty list asks
    /// for every task the cluster manager believes we own.
    async fn reconcile_tasks(&self, statuses: &[TaskStatus]) -> Result<()>;
}

/// One recorded `accept_offers` call.
#[derive(Debug, Clone)]
pub struct AcceptCall {
    pub offer_ids: Vec<OfferId>,
    pub operations: Vec<Operation>,
}

/// One recorded `decline_offer` call.
#[derive(Debug, Clone)]
pub struct DeclineCall {
    pub offer_id: OfferId,
    pub refuse_seconds: u64,
}

/// Recording driver for tests and development.
#[derive(Debug, Default)]
pub struct MockDriver {
    declines: std::sync::Mutex<Vec<DeclineCall>>,
    accepts: std::sync::Mutex<Vec<AcceptCall>>,
    reconciles: std::sync::Mutex<Vec<Vec<TaskStatus>>>,
}

impl MockDriver {
    /// Creates an empty recording driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines recorded so far.
    #[must_use]
    pub fn declines(&self) -> Vec<DeclineCall> {
        self.declines.lock().unwrap().clone()
    }

    /// Accepts recorded so far.
    #[must_use]
    pub fn accepts(&self) -> Vec<AcceptCall> {
        self.accepts.lock().unwrap().clone()
    }

    /// Reconcile requests recorded so far, in call order.
    #[must_use]
    pub fn reconciles(&self) -> Vec<Vec<TaskStatus>> {
        self.reconciles.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchedulerDriver for MockDriver {
    async fn decline_offer(&self, offer_id: &OfferId, filters: &Filters) -> Result<()> {
        self.declines.lock().unwrap().push(DeclineCall {
            offer_id: offer_id.clone(),
            refuse_seconds: filters.refuse_seconds,
        });
        Ok(())
    }

    async fn accept_offers(
        &self,
        offer_ids: &[OfferId],
        operations: &[Operation],
        _filters: &Filters,
    ) -> Result<()> {
        self.accepts.lock().unwrap().push(AcceptCall {
            offer_ids: offer_ids.to_vec(),
            operations: operations.to_vec(),
        });
        Ok(())
    }

    async fn reconcile_tasks(&self, statuses: &[TaskStatus]) -> Result<()> {
        self.reconciles.lock().unwrap().push(statuses.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_driver_records_calls() {
        let driver = MockDriver::new();
        let offer_id: OfferId = "offer-a".parse().unwrap();

        driver
            .decline_offer(&offer_id, &Filters::refuse_short())
            .await
            .unwrap();
        driver
            .accept_offers(&[offer_id.clone()], &[], &Filters::default())
            .await
            .unwrap();
        driver.reconcile_tasks(&[]).await.unwrap();

        assert_eq!(driver.declines().len(), 1);
        assert_eq!(driver.declines()[0].refuse_seconds, 5);
        assert_eq!(driver.accepts().len(), 1);
        assert_eq!(driver.reconciles().len(), 1);
    }
}
