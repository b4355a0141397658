//! # CAS Test Utilities
//!
//! Shared test utilities for the CAS client.
//!
//! ## Modules
//!
//! - `responses` - Builders for CAS 1.0 / 2.0 / 3.0 response bodies
//! - `mock_fetcher` - Scripted `Fetcher` that records requested URLs
//! - `server_harness` - `wiremock`-backed CAS server (`TestCasServer`)
//! - `logging` - Test log output
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cas_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let fetcher = MockFetcher::responding(
//!         CasResponse::success("alice").attribute("mail", "alice@example.org").to_xml(),
//!     );
//!     let validator = TicketValidator::new(TEST_SERVER_PREFIX, Protocol::Cas20, fetcher.clone())?;
//!
//!     let assertion = validator.validate("ST-1", "https://app/").await?;
//!     assert_eq!(assertion.principal().name(), "alice");
//!     assert!(fetcher.last_url().unwrap().contains("ticket=ST-1"));
//! }
//! ```

pub mod mock_fetcher;
pub mod responses;
pub mod server_harness;
pub mod logging;

// Re-export commonly used items
pub use mock_fetcher::*;
pub use responses::*;
pub use server_harness::*;
pub use logging::init_test_tracing;
