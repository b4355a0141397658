//! PGT storage cleanup background task.
//!
//! Expiry is the only eviction mechanism for PGT correlations, so a
//! process-wide task sweeps the storage at an interval shorter than the TTL.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is cancelled. A sweep already
//! in progress completes first.

use crate::config::{CasClientConfig, ConfigError};
use crate::observability::metrics;
use crate::proxy::ProxyGrantingTicketStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Default sweep interval in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 30;

/// Configuration for the cleanup task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgtCleanupConfig {
    interval: Duration,
}

impl PgtCleanupConfig {
    /// Sweep every `interval`. Should be shorter than the storage TTL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCleanupInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidCleanupInterval(
                "cleanup interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self { interval })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PgtCleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECONDS),
        }
    }
}

impl TryFrom<&CasClientConfig> for PgtCleanupConfig {
    type Error = ConfigError;

    fn try_from(config: &CasClientConfig) -> Result<Self, Self::Error> {
        Self::new(config.pgt_cleanup_interval())
    }
}

/// Start the PGT cleanup background task.
///
/// Sweeps `storage` every `config.interval()` until `cancel_token` is
/// cancelled. A failing sweep is logged and retried on the next tick.
///
/// Typically spawned once per process:
///
/// ```rust,ignore
/// let token = CancellationToken::new();
/// tokio::spawn(start_pgt_cleanup(storage.clone(), PgtCleanupConfig::default(), token.clone()));
/// ```
#[instrument(skip_all, name = "cas.task.pgt_cleanup")]
pub async fn start_pgt_cleanup(
    storage: Arc<dyn ProxyGrantingTicketStorage>,
    config: PgtCleanupConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "cas.proxy.cleanup",
        interval_secs = config.interval.as_secs(),
        "Starting PGT cleanup task"
    );

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_cleanup(storage.as_ref()).await;
            }
            () = cancel_token.cancelled() => {
                info!(
                    target: "cas.proxy.cleanup",
                    "PGT cleanup task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "cas.proxy.cleanup", "PGT cleanup task stopped");
}

/// Run a single sweep. Returns the number of entries removed.
pub(crate) async fn run_cleanup(storage: &dyn ProxyGrantingTicketStorage) -> usize {
    match storage.clean_up().await {
        Ok(removed) => {
            if removed > 0 {
                debug!(target: "cas.proxy.cleanup", removed, "Swept expired PGT correlations");
            }
            metrics::record_pgt_swept(removed);
            removed
        }
        Err(e) => {
            error!(target: "cas.proxy.cleanup", error = %e, "PGT storage sweep failed");
            0
        }
    }
}
