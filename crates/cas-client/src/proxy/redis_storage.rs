//! Redis-backed PGT correlation storage.
//!
//! Lets the callback endpoint and the validating request land on different
//! instances. Each correlation is one string key:
//!
//! - `cas:pgtiou:{iou}` - the PGT, written with `SET NX EX`
//!
//! `NX` gives write-once semantics (a second save is reported as a
//! duplicate) and `EX` hands expiry to the server, so `clean_up` has
//! nothing to do.
//!
//! # Usage
//!
//! ```rust,ignore
//! let storage = RedisPgtStorage::new("redis://localhost:6379", Duration::from_secs(60)).await?;
//! storage.save("PGTIOU-1", SecretString::from("PGT-1")).await?;
//! ```

use crate::error::StorageError;
use crate::proxy::storage::ProxyGrantingTicketStorage;
use crate::secret::{ExposeSecret, SecretString};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Default key prefix for correlations.
pub const DEFAULT_KEY_PREFIX: &str = "cas:pgtiou:";

/// Redis correlation store.
///
/// Cheap to clone: the multiplexed connection is shared, not locked.
#[derive(Clone)]
pub struct RedisPgtStorage {
    connection: MultiplexedConnection,
    key_prefix: String,
    ttl: Duration,
}

impl RedisPgtStorage {
    /// Connect to Redis at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backend` if the client cannot be opened or
    /// the connection fails.
    pub async fn new(redis_url: &str, ttl: Duration) -> Result<Self, StorageError> {
        let client = Client::open(redis_url).map_err(|e| {
            // The URL may carry credentials, log only the error
            error!(target: "cas.proxy.storage", error = %e, "Failed to open Redis client");
            StorageError::Backend(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "cas.proxy.storage", error = %e, "Failed to connect to Redis");
                StorageError::Backend(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self::from_connection(connection, ttl))
    }

    /// Wrap an existing connection.
    #[must_use]
    pub fn from_connection(connection: MultiplexedConnection, ttl: Duration) -> Self {
        Self {
            connection,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl,
        }
    }

    /// Use `prefix` instead of [`DEFAULT_KEY_PREFIX`].
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, iou: &str) -> String {
        format!("{}{iou}", self.key_prefix)
    }
}

/// Expiry in whole seconds, rounded up and never zero (`EX 0` is an error).
fn expiry_seconds(ttl: Duration) -> u64 {
    let secs = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0));
    secs.max(1)
}

#[async_trait::async_trait]
impl ProxyGrantingTicketStorage for RedisPgtStorage {
    #[instrument(skip_all)]
    async fn save(&self, iou: &str, pgt: SecretString) -> Result<(), StorageError> {
        let mut conn = self.connection.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(iou))
            .arg(pgt.expose_secret())
            .arg("NX")
            .arg("EX")
            .arg(expiry_seconds(self.ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "cas.proxy.storage", error = %e, "Failed to save correlation");
                StorageError::Backend(format!("Failed to save correlation: {e}"))
            })?;

        // Nil reply means NX refused the write
        if reply.is_none() {
            warn!(
                target: "cas.proxy.storage",
                "PGT-IOU saved twice, keeping the first PGT"
            );
            return Err(StorageError::DuplicateCorrelation {
                iou: iou.to_string(),
            });
        }

        debug!(target: "cas.proxy.storage", "Correlation saved");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn retrieve(&self, iou: &str) -> Result<Option<SecretString>, StorageError> {
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(self.key(iou)).await.map_err(|e| {
            warn!(target: "cas.proxy.storage", error = %e, "Failed to read correlation");
            StorageError::Backend(format!("Failed to read correlation: {e}"))
        })?;

        Ok(value.map(SecretString::from))
    }

    #[instrument(skip_all)]
    async fn remove(&self, iou: &str) -> Result<bool, StorageError> {
        let mut conn = self.connection.clone();

        let deleted: u64 = conn.del(self.key(iou)).await.map_err(|e| {
            warn!(target: "cas.proxy.storage", error = %e, "Failed to delete correlation");
            StorageError::Backend(format!("Failed to delete correlation: {e}"))
        })?;

        Ok(deleted > 0)
    }

    /// Redis expires keys itself.
    async fn clean_up(&self) -> Result<usize, StorageError> {
        Ok(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::proxy::storage::DEFAULT_PGT_TTL;

    #[test]
    fn test_expiry_seconds_rounds_up() {
        assert_eq!(expiry_seconds(Duration::from_secs(60)), 60);
        assert_eq!(expiry_seconds(Duration::from_millis(60_001)), 61);
        assert_eq!(expiry_seconds(Duration::from_millis(1)), 1);
    }

    #[test]
    fn test_expiry_seconds_never_zero() {
        assert_eq!(expiry_seconds(Duration::ZERO), 1);
    }

    #[test]
    fn test_expiry_seconds_saturates() {
        assert_eq!(expiry_seconds(Duration::MAX), u64::MAX);
        assert_eq!(expiry_seconds(Duration::new(u64::MAX, 1)), u64::MAX);
    }

    #[test]
    fn test_default_key_prefix() {
        assert_eq!(DEFAULT_KEY_PREFIX, "cas:pgtiou:");
        assert_eq!(DEFAULT_PGT_TTL, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_url() {
        let result = RedisPgtStorage::new("not-a-redis-url", DEFAULT_PGT_TTL).await;
        assert!(matches!(result, Err(StorageError::Backend(msg)) if msg.contains("open")));
    }

    // Live Redis tests. Run with:
    // REDIS_URL=redis://localhost:6379 cargo test -p cas-client -- --ignored

    async fn live_storage(ttl: Duration) -> RedisPgtStorage {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let prefix = format!("cas:test:{}:", std::process::id());
        RedisPgtStorage::new(&url, ttl)
            .await
            .expect("Redis must be reachable for ignored tests")
            .with_key_prefix(prefix)
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_live_save_is_write_once() {
        let storage = live_storage(DEFAULT_PGT_TTL).await;
        storage.remove("PGTIOU-once").await.unwrap();

        storage
            .save("PGTIOU-once", SecretString::from("PGT-first"))
            .await
            .unwrap();
        let duplicate = storage
            .save("PGTIOU-once", SecretString::from("PGT-second"))
            .await;

        assert_eq!(
            duplicate,
            Err(StorageError::DuplicateCorrelation {
                iou: "PGTIOU-once".to_string()
            })
        );
        let stored = storage.retrieve("PGTIOU-once").await.unwrap().unwrap();
        assert_eq!(stored.expose_secret(), "PGT-first");

        storage.remove("PGTIOU-once").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_live_retrieve_keeps_entry_and_remove_deletes() {
        let storage = live_storage(DEFAULT_PGT_TTL).await;
        storage.remove("PGTIOU-keep").await.unwrap();

        assert!(storage.retrieve("PGTIOU-keep").await.unwrap().is_none());

        storage
            .save("PGTIOU-keep", SecretString::from("PGT-keep"))
            .await
            .unwrap();
        assert!(storage.retrieve("PGTIOU-keep").await.unwrap().is_some());
        assert!(storage.retrieve("PGTIOU-keep").await.unwrap().is_some());

        assert!(storage.remove("PGTIOU-keep").await.unwrap());
        assert!(!storage.remove("PGTIOU-keep").await.unwrap());
        assert!(storage.retrieve("PGTIOU-keep").await.unwrap().is_none());
        assert_eq!(storage.clean_up().await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_live_entry_expires() {
        let storage = live_storage(Duration::from_secs(1)).await;
        storage.remove("PGTIOU-expiring").await.unwrap();

        storage
            .save("PGTIOU-expiring", SecretString::from("PGT-expiring"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2_100)).await;

        assert!(storage.retrieve("PGTIOU-expiring").await.unwrap().is_none());
        storage
            .save("PGTIOU-expiring", SecretString::from("PGT-again"))
            .await
            .unwrap();
        storage.remove("PGTIOU-expiring").await.unwrap();
    }
}
