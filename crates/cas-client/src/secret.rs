//! Redacting wrappers for CAS credentials.
//!
//! Proxy-granting tickets are bearer credentials: whoever holds one can mint
//! proxy tickets for the user. They are carried as [`SecretString`] from the
//! moment the callback saves them until a proxy ticket is requested, so any
//! `Debug` output (including `tracing` fields captured with `?`) shows
//! `[REDACTED]` instead of the value.
//!
//! ```rust
//! use cas_client::secret::{ExposeSecret, SecretString};
//!
//! let pgt = SecretString::from("PGT-1-abc");
//! assert!(!format!("{pgt:?}").contains("PGT-1-abc"));
//! assert_eq!(pgt.expose_secret(), "PGT-1-abc");
//! ```
//!
//! Service and proxy tickets are single-use and short-lived; they stay plain
//! `&str` at the API surface but are never attached to log events.

pub use secrecy::{ExposeSecret, SecretString};
