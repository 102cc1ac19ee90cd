//! Scheduler metrics.
//!
//! Counters and timers for the offer pipeline, recorded through the
//! `metrics` facade. The recorder (StatsD or otherwise) is wired by the
//! embedding process, not here.

use std::time::Duration;

use ballast_protocol::OfferRecommendation;
use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Offers received through `enqueue`.
pub const OFFERS_ENQUEUED: &str = "ballast_offers_enqueued_total";

/// Offers drained and evaluated by the consumer.
pub const OFFERS_PROCESSED: &str = "ballast_offers_processed_total";

/// Offers declined, labeled by interval.
pub const OFFERS_DECLINED: &str = "ballast_offers_declined_total";

/// Recommendations applied, labeled by kind.
pub const RECOMMENDATIONS: &str = "ballast_recommendations_total";

/// Wall time spent evaluating one offer batch.
pub const PROCESS_DURATION: &str = "ballast_offer_processing_duration_seconds";

/// Registers metric descriptions.
///
/// Call once at startup after installing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(OFFERS_ENQUEUED, "Total offers received from the cluster manager");
    describe_counter!(OFFERS_PROCESSED, "Total offers drained and evaluated");
    describe_counter!(OFFERS_DECLINED, "Total offers declined, by refuse interval");
    describe_counter!(RECOMMENDATIONS, "Total recommendations applied, by kind");
    describe_histogram!(PROCESS_DURATION, "Offer batch evaluation duration in seconds");
}

/// Records offers arriving on the queue.
pub fn inc_offers_enqueued(count: usize) {
    counter!(OFFERS_ENQUEUED).increment(count as u64);
}

/// Records offers drained and evaluated.
pub fn inc_offers_processed(count: usize) {
    counter!(OFFERS_PROCESSED).increment(count as u64);
}

/// Records short-interval declines.
pub fn inc_declines_short(count: usize) {
    counter!(OFFERS_DECLINED, "interval" => "short").increment(count as u64);
}

/// Records long-interval declines.
pub fn inc_declines_long(count: usize) {
    counter!(OFFERS_DECLINED, "interval" => "long").increment(count as u64);
}

/// Records applied recommendations by kind.
pub fn inc_recommendations(recommendations: &[OfferRecommendation]) {
    for recommendation in recommendations {
        counter!(RECOMMENDATIONS, "kind" => recommendation.kind()).increment(1);
    }
}

/// Records the duration of one offer batch evaluation.
pub fn record_process_duration(elapsed: Duration) {
    histogram!(PROCESS_DURATION).record(elapsed.as_secs_f64());
}
