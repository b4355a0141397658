//! Proxy support.
//!
//! # Components
//!
//! - `storage` - PGT-IOU to PGT correlation contract and in-memory store
//! - `redis_storage` - Redis-backed store shared across instances
//! - `cleanup` - Periodic sweep of expired correlations
//! - `retriever` - Proxy ticket retrieval using a resolved PGT

pub mod cleanup;
pub mod redis_storage;
pub mod retriever;
pub mod storage;

pub use cleanup::{start_pgt_cleanup, PgtCleanupConfig};
pub use redis_storage::RedisPgtStorage;
pub use retriever::{Cas20ProxyRetriever, ProxyRetriever};
pub use storage::{InMemoryPgtStorage, ProxyGrantingTicketStorage};
