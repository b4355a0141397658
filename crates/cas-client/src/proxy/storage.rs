//! PGT-IOU to PGT correlation storage.
//!
//! The CAS server delivers the PGT to the callback URL out of band, keyed by
//! a PGT-IOU that also appears in the validation response. The callback
//! handler saves the pair; the validator retrieves the PGT by IOU.
//!
//! Entries live for a fixed TTL. There is no capacity bound: expiry is the
//! only eviction, so `clean_up` must run periodically (see
//! [`start_pgt_cleanup`](crate::proxy::start_pgt_cleanup)).

use crate::error::StorageError;
use crate::secret::SecretString;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Default lifetime of a correlation.
pub const DEFAULT_PGT_TTL: Duration = Duration::from_secs(60);

/// Correlation store contract.
///
/// Implementations must be safe under concurrent `save`, `retrieve` and
/// `clean_up`: a completed `save` is visible to every later `retrieve`, and
/// a sweep never removes an entry before its TTL has elapsed.
#[async_trait::async_trait]
pub trait ProxyGrantingTicketStorage: Send + Sync {
    /// Store a new correlation.
    ///
    /// Saving an IOU that is already present fails with
    /// `StorageError::DuplicateCorrelation` and keeps the first PGT.
    async fn save(&self, iou: &str, pgt: SecretString) -> Result<(), StorageError>;

    /// Look up the PGT for `iou` without removing it.
    ///
    /// An unknown or expired IOU is `Ok(None)`.
    async fn retrieve(&self, iou: &str) -> Result<Option<SecretString>, StorageError>;

    /// Drop the correlation for `iou`. Returns whether one existed.
    async fn remove(&self, iou: &str) -> Result<bool, StorageError>;

    /// Remove every entry older than the TTL. Returns the number removed.
    async fn clean_up(&self) -> Result<usize, StorageError>;
}

struct PgtEntry {
    pgt: SecretString,
    inserted_at: Instant,
}

/// Process-local correlation store.
///
/// Readers share the lock; `save`, `remove` and `clean_up` take it
/// exclusively, so a reader never sees a partially written entry.
pub struct InMemoryPgtStorage {
    entries: RwLock<HashMap<String, PgtEntry>>,
    ttl: Duration,
}

impl Default for InMemoryPgtStorage {
    fn default() -> Self {
        Self::new(DEFAULT_PGT_TTL)
    }
}

impl InMemoryPgtStorage {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_expired(&self, entry: &PgtEntry, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) >= self.ttl
    }
}

#[async_trait::async_trait]
impl ProxyGrantingTicketStorage for InMemoryPgtStorage {
    #[instrument(skip_all)]
    async fn save(&self, iou: &str, pgt: SecretString) -> Result<(), StorageError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(iou) {
            if !self.is_expired(existing, now) {
                warn!(
                    target: "cas.proxy.storage",
                    "PGT-IOU saved twice, keeping the first PGT"
                );
                return Err(StorageError::DuplicateCorrelation {
                    iou: iou.to_string(),
                });
            }
            debug!(target: "cas.proxy.storage", "Replacing expired correlation");
        }

        entries.insert(
            iou.to_string(),
            PgtEntry {
                pgt,
                inserted_at: now,
            },
        );

        debug!(target: "cas.proxy.storage", entries = entries.len(), "Correlation saved");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn retrieve(&self, iou: &str) -> Result<Option<SecretString>, StorageError> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        Ok(entries
            .get(iou)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.pgt.clone()))
    }

    #[instrument(skip_all)]
    async fn remove(&self, iou: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().await.remove(iou).is_some())
    }

    #[instrument(skip_all)]
    async fn clean_up(&self) -> Result<usize, StorageError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        let removed = before - entries.len();

        if removed > 0 {
            debug!(
                target: "cas.proxy.storage",
                removed,
                remaining = entries.len(),
                "Expired correlations removed"
            );
        }

        Ok(removed)
    }
}
