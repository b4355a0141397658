//! CAS (Central Authentication Service) client.
//!
//! Validates service and proxy tickets against a CAS server, turns the
//! server's response into a typed [`Assertion`], and correlates the
//! out-of-band proxy-granting-ticket callback with the validation response.
//!
//! # Architecture
//!
//! ```text
//! TicketValidator -> Fetcher -> ResponseParser -> ProxyGrantingTicketStorage -> Assertion
//! ```
//!
//! # Modules
//!
//! - `assertion` - Validated principal, attributes and proxy chain
//! - `config` - Client configuration from environment
//! - `error` - Error taxonomy shared across the crate
//! - `fetcher` - HTTP fetch capability and its `reqwest` implementation
//! - `observability` - Metrics recorded through the `metrics` facade
//! - `proxy` - PGT storage, cleanup task and proxy ticket retrieval
//! - `secret` - Redacting wrappers for tickets and PGTs
//! - `validation` - Request construction, response parsing, validation

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assertion;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod observability;
pub mod proxy;
pub mod secret;
pub mod validation;

pub use assertion::{Assertion, AttributePrincipal, AttributeValue, Attributes};
pub use config::{CasClientConfig, ConfigError};
pub use error::{
    FetchError, MalformedResponseError, ProxyError, StorageError, TicketValidationError,
};
pub use fetcher::{Fetcher, HttpFetcher};
pub use proxy::{
    start_pgt_cleanup, Cas20ProxyRetriever, InMemoryPgtStorage, PgtCleanupConfig,
    ProxyGrantingTicketStorage, ProxyRetriever, RedisPgtStorage,
};
pub use validation::{
    Protocol, ProxyPolicy, ResponseParser, TicketValidator, ValidationOutcome,
};
