//! Scheduler configuration from the environment.

use anyhow::Result;

/// Runtime configuration for the scheduler core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service name, used in artifact URLs and logging.
    pub service_name: String,

    /// Path to the task-status database.
    pub state_db_path: String,

    /// Offer queue capacity; zero means unbounded.
    pub offer_queue_capacity: usize,

    /// Seconds between reconcile timer ticks.
    pub reconcile_interval_secs: u64,

    /// Process offers inline on the enqueueing task instead of on the
    /// dedicated consumer. Test-only behavior; leave off in production.
    pub synchronous_offer_processing: bool,

    /// Log level when RUST_LOG is unset.
    pub log_level: String,
}

impl Config {
    /// Loads configuration from `BALLAST_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let service_name =
            std::env::var("BALLAST_SERVICE_NAME").unwrap_or_else(|_| "ballast".to_string());

        let state_db_path = std::env::var("BALLAST_STATE_DB_PATH")
            .unwrap_or_else(|_| "/var/lib/ballast/state.db".to_string());

        let offer_queue_capacity = std::env::var("BALLAST_OFFER_QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let reconcile_interval_secs = std::env::var("BALLAST_RECONCILE_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let synchronous_offer_processing = std::env::var("BALLAST_SYNCHRONOUS_OFFERS")
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let log_level = std::env::var("BALLAST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            service_name,
            state_db_path,
            offer_queue_capacity,
            reconcile_interval_secs,
            synchronous_offer_processing,
            log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "ballast".to_string(),
            state_db_path: "/var/lib/ballast/state.db".to_string(),
            offer_queue_capacity: 100,
            reconcile_interval_secs: 5,
            synchronous_offer_processing: false,
            log_level: "info".to_string(),
        }
    }
}
