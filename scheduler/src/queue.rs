//! Bounded FIFO buffer of pending offers.

use std::collections::VecDeque;
use std::sync::Mutex;

use ballast_id::OfferId;
use ballast_protocol::Offer;
use tokio::sync::{watch, Notify};
use tracing::debug;

/// A bounded FIFO of offers awaiting evaluation.
///
/// Multiple producers (driver callbacks) push via [`OfferQueue::offer`];
/// the single consumer drains via [`OfferQueue::take_all`]. A capacity of
/// zero means unbounded.
pub struct OfferQueue {
    capacity: usize,
    inner: Mutex<VecDeque<Offer>>,
    available: Notify,
}

impl OfferQueue {
    /// Default capacity used by the offer processor.
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Creates a queue with the given capacity (zero for unbounded).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    /// Attempts to append an offer without blocking.
    ///
    /// Returns false if the queue is full; the caller is expected to
    /// decline the offer back to the cluster manager.
    pub fn offer(&self, offer: Offer) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            if self.capacity != 0 && inner.len() >= self.capacity {
                return false;
            }
            inner.push_back(offer);
        }
        self.available.notify_one();
        true
    }

    /// Removes a buffered offer by id (used when an offer is rescinded).
    ///
    /// Returns true if the offer was present.
    pub fn remove(&self, offer_id: &OfferId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.len();
        inner.retain(|offer| offer.id != *offer_id);
        let removed = inner.len() != before;
        if removed {
            debug!(offer_id = %offer_id, "Removed rescinded offer from queue");
        }
        removed
    }

    /// Number of buffered offers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Returns true if no offers are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Waits until at least one offer is buffered, then drains everything
    /// currently buffered in arrival order.
    ///
    /// Returns an empty list only when shutdown is signaled; the consumer
    /// treats that as a spurious wake.
    pub async fn take_all(&self, shutdown: &mut watch::Receiver<bool>) -> Vec<Offer> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                if !inner.is_empty() {
                    return inner.drain(..).collect();
                }
            }
            if *shutdown.borrow() {
                return Vec::new();
            }
            tokio::select! {
                _ = self.available.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Vec::new();
                    }
                }
            }
        }
    }
}
